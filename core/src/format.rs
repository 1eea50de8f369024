//! Chat text rendering for panel responses.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{display_value, is_truthy, PanelResponse};

pub const HELP_TEXT: &str = "可用命令:\n- bt status\n- bt sites\n- bt restart panel\n- bt help";

pub const UNKNOWN_COMMAND_TEXT: &str = "未知命令，请使用 bt help 查看支持的命令。";

pub fn format_system_status(response: &PanelResponse) -> String {
    let mut lines = vec!["BT Panel 系统状态:".to_string()];
    if let Some(Value::String(system)) = response.get("system") {
        lines.push(format!("系统版本: {system}"));
    }
    for key in ["cpu", "mem", "disk", "network"] {
        if let Some(value) = response.get(key) {
            lines.push(format!("{}: {}", key.to_uppercase(), display_value(value)));
        }
    }
    lines.push(format!("消息: {}", response.message()));
    lines.join("\n")
}

pub fn format_site_list(response: &PanelResponse) -> String {
    let mut lines = vec!["站点列表:".to_string()];
    let sites: Vec<&Map<String, Value>> = match response.get("data") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    };
    for site in &sites {
        let name = site
            .get("name")
            .map(display_value)
            .unwrap_or_else(|| "未知站点".to_string());
        let state = if site.get("status").is_some_and(is_truthy) {
            "运行"
        } else {
            "停止"
        };
        let domain = site.get("domain").map(display_value).unwrap_or_default();
        lines.push(format!("- {name} ({state}) {domain}"));
    }
    if sites.is_empty() {
        lines.push("暂无站点数据".to_string());
    }
    lines.push(format!("消息: {}", response.message()));
    lines.join("\n")
}

pub fn format_restart(response: &PanelResponse) -> String {
    format!("面板重启结果: {}", response.message())
}

pub fn format_error(err: &ApiError) -> String {
    format!("BT Panel 请求失败: {err}")
}
