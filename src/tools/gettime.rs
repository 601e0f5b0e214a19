//! gettime：返回当前本地时间

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

use crate::tools::Tool;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ANNOTATION: &str = "<RM_AGENT_TOOL>
Tool Name: gettime
Description: Gets the current local time.
Input: None
Output: current time as YYYY-MM-DD HH:MM:SS
</RM_AGENT_TOOL>";

/// 时间工具；`at` 固定返回某一时刻（测试用）
#[derive(Debug, Clone, Default)]
pub struct GetTimeTool {
    fixed: Option<NaiveDateTime>,
}

impl GetTimeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(time: NaiveDateTime) -> Self {
        Self { fixed: Some(time) }
    }
}

#[async_trait]
impl Tool for GetTimeTool {
    fn name(&self) -> &str {
        "gettime"
    }

    fn annotation(&self) -> &str {
        ANNOTATION
    }

    async fn call(&self, _function: &str, _argument: &str) -> Result<String, String> {
        let now = self.fixed.unwrap_or_else(|| Local::now().naive_local());
        Ok(now.format(TIME_FORMAT).to_string())
    }
}
