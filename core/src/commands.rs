//! Chat command layer.
//!
//! Maps `bt ...` chat text onto panel calls and renders the outcome. The
//! handler never fails: API errors and unknown input both become reply text.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

use crate::client::PanelClient;
use crate::format::{
    format_error, format_restart, format_site_list, format_system_status, HELP_TEXT, UNKNOWN_COMMAND_TEXT,
};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Sites,
    RestartPanel,
    Help,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Status, Command::Sites, Command::RestartPanel, Command::Help];

    /// Canonical chat text for this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Status => "bt status",
            Command::Sites => "bt sites",
            Command::RestartPanel => "bt restart panel",
            Command::Help => "bt help",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command: {0}")]
pub struct CommandError(pub String);

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_start_matches('/')
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == normalized)
            .ok_or_else(|| CommandError(s.trim().to_string()))
    }
}

/// Run one parsed command and render the reply.
pub fn run_command<T: Transport>(client: &PanelClient<T>, command: Command) -> String {
    info!(%command, "handling chat command");
    let rendered = match command {
        Command::Help => return HELP_TEXT.to_string(),
        Command::Status => client.system_status().map(|r| format_system_status(&r)),
        Command::Sites => client.list_sites().map(|r| format_site_list(&r)),
        Command::RestartPanel => client.restart_panel().map(|r| format_restart(&r)),
    };
    rendered.unwrap_or_else(|err| format_error(&err))
}

/// Parse chat text and reply to it.
pub fn handle_command<T: Transport>(client: &PanelClient<T>, text: &str) -> String {
    match text.parse::<Command>() {
        Ok(command) => run_command(client, command),
        Err(_) => UNKNOWN_COMMAND_TEXT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelConfig;
    use crate::error::ApiError;
    use crate::http::{HttpResponse, SignedRequest};

    struct Canned(u16, &'static str);

    impl Transport for Canned {
        fn execute(&self, _request: &SignedRequest, _config: &PanelConfig) -> Result<HttpResponse, ApiError> {
            Ok(HttpResponse {
                status: self.0,
                headers: Vec::new(),
                body: self.1.as_bytes().to_vec(),
            })
        }
    }

    fn client(status: u16, body: &'static str) -> PanelClient<Canned> {
        PanelClient::with_transport(PanelConfig::new("https://h", "k"), Canned(status, body))
    }

    #[test]
    fn parses_canonical_commands() {
        assert_eq!("bt status".parse::<Command>().unwrap(), Command::Status);
        assert_eq!("bt sites".parse::<Command>().unwrap(), Command::Sites);
        assert_eq!("bt restart panel".parse::<Command>().unwrap(), Command::RestartPanel);
        assert_eq!("bt help".parse::<Command>().unwrap(), Command::Help);
    }

    #[test]
    fn parsing_normalizes_case_whitespace_and_slash() {
        assert_eq!("  BT   Restart\tPanel ".parse::<Command>().unwrap(), Command::RestartPanel);
        assert_eq!("/bt status".parse::<Command>().unwrap(), Command::Status);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = "bt reboot".parse::<Command>().unwrap_err();
        assert_eq!(err, CommandError("bt reboot".to_string()));
    }

    #[test]
    fn help_needs_no_network() {
        let config = PanelConfig::new("", "");
        let client = PanelClient::with_transport(config, Canned(500, ""));
        assert_eq!(handle_command(&client, "bt help"), HELP_TEXT);
    }

    #[test]
    fn unknown_text_gets_hint() {
        assert_eq!(handle_command(&client(200, "{}"), "hello"), UNKNOWN_COMMAND_TEXT);
    }

    #[test]
    fn status_renders_panel_data() {
        let reply = handle_command(&client(200, r#"{"system":"Debian 12","cpu":4}"#), "bt status");
        assert_eq!(reply, "BT Panel 系统状态:\n系统版本: Debian 12\nCPU: 4\n消息: OK");
    }

    #[test]
    fn restart_reports_message() {
        let reply = handle_command(&client(200, r#"{"status":true,"msg":"done"}"#), "bt restart panel");
        assert_eq!(reply, "面板重启结果: done");
    }

    #[test]
    fn failures_become_reply_text() {
        let reply = handle_command(&client(500, "oops"), "bt sites");
        assert_eq!(reply, "BT Panel 请求失败: HTTP 500: oops");
    }

    #[test]
    fn missing_config_is_reported_not_raised() {
        let config = PanelConfig::new("https://h", "");
        let client = PanelClient::with_transport(config, Canned(200, "{}"));
        let reply = handle_command(&client, "bt status");
        assert!(reply.starts_with("BT Panel 请求失败: configuration error"), "{reply}");
    }
}
