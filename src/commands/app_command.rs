use crate::model::FormFields;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Airports,
    Airlines,
    Routes {
        source: Option<String>,
        dest: Option<String>,
    },
    Search(String),
    Filter(String),
    Select(String),
    New(FormFields),
    Edit(FormFields),
    Delete,
    Reload,
    Stats,
    Open(String),
    Help,
    Quit,
    Unknown(String),
}

pub const COMMANDS: &[&str] = &[
    "airports", "airlines", "routes", "search", "filter", "select", "new", "edit", "delete",
    "reload", "stats", "open", "help", "quit",
];

pub const HELP: &str = "可用命令: airports | airlines | routes <SRC> <DST> | search <文本> | filter <文本> | select <IATA> | new key=value ... | edit key=value ... | delete | reload | stats | open <深链接> | help | quit";

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, rest) = match s.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (s, ""),
        };
        if head.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match head {
            "airports" | "ap" => Ok(AppCommand::Airports),
            "airlines" | "al" => Ok(AppCommand::Airlines),
            "routes" | "route" => {
                let mut parts = rest.split_whitespace();
                let source = parts.next().map(|s| s.to_string());
                let dest = parts.next().map(|s| s.to_string());
                Ok(AppCommand::Routes { source, dest })
            }
            "search" => Ok(AppCommand::Search(rest.to_string())),
            "filter" => {
                if rest == "clear" || rest == "--clear" {
                    Ok(AppCommand::Filter(String::new()))
                } else {
                    Ok(AppCommand::Filter(rest.to_string()))
                }
            }
            "select" => {
                if rest.is_empty() {
                    Ok(AppCommand::Unknown("用法: select <IATA>".to_string()))
                } else {
                    Ok(AppCommand::Select(rest.to_string()))
                }
            }
            "new" | "edit" => match parse_fields(rest) {
                Some(fields) if head == "new" => Ok(AppCommand::New(fields)),
                Some(fields) if !fields.is_empty() => Ok(AppCommand::Edit(fields)),
                Some(_) => Ok(AppCommand::Unknown("用法: edit key=value ...".to_string())),
                None => Ok(AppCommand::Unknown(format!(
                    "用法: {} key=value ...（含空格的值用双引号）",
                    head
                ))),
            },
            "delete" | "del" => Ok(AppCommand::Delete),
            "reload" => Ok(AppCommand::Reload),
            "stats" => Ok(AppCommand::Stats),
            "open" => {
                if rest.is_empty() {
                    Ok(AppCommand::Unknown("用法: open /airports?selected=SFO".to_string()))
                } else {
                    Ok(AppCommand::Open(rest.to_string()))
                }
            }
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", head))),
        }
    }
}

fn field_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*([A-Za-z_][A-Za-z0-9_]*)=(?:"([^"]*)"|(\S*))"#).unwrap())
}

/// `name="San Francisco Intl" iata=SFO altitude=13`
///
/// 有无法识别的片段时返回 `None`。
pub fn parse_fields(input: &str) -> Option<FormFields> {
    let re = field_pattern();
    let mut fields = FormFields::new();
    let mut rest = input;
    while !rest.trim().is_empty() {
        let caps = re.captures(rest)?;
        let key = caps.get(1)?.as_str().to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");
        fields.insert(key, value.to_string());
        rest = &rest[caps.get(0)?.end()..];
    }
    Some(fields)
}
