//! Output formatting for `svcwatchd check`.

use clap::ValueEnum;

use svcwatch_health::ServiceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(statuses: &[ServiceStatus], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(statuses)?),
        OutputFormat::Text => Ok(render_text(statuses)),
    }
}

fn render_text(statuses: &[ServiceStatus]) -> String {
    let width = statuses
        .iter()
        .map(|s| s.service_name.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for s in statuses {
        out.push_str(&format!(
            "{} {:<width$}  {:<13}  {}\n",
            s.symbol(),
            s.service_name,
            s.kind.label(),
            s.status_message,
        ));
    }
    let down = statuses.iter().filter(|s| !s.is_available).count();
    out.push_str(&format!(
        "\n{} of {} services available\n",
        statuses.len() - down,
        statuses.len()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcwatch_health::ServiceKind;

    fn sample() -> Vec<ServiceStatus> {
        vec![
            ServiceStatus::new(
                "llm",
                ServiceKind::Generic,
                true,
                false,
                "Service is responding (HTTP 200)",
            ),
            ServiceStatus::new(
                "requirements",
                ServiceKind::AuthTolerant,
                false,
                false,
                "Service is unreachable: connection refused",
            ),
        ]
    }

    #[test]
    fn text_lists_every_service_and_summary() {
        let out = render(&sample(), OutputFormat::Text).unwrap();
        assert!(out.contains("✅ llm"));
        assert!(out.contains("❌ requirements"));
        assert!(out.contains("auth-tolerant"));
        assert!(out.contains("1 of 2 services available"));
    }

    #[test]
    fn json_is_an_array_of_statuses() {
        let out = render(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["service_name"], "llm");
        assert_eq!(items[1]["kind"], "auth-tolerant");
        assert_eq!(items[1]["is_available"], false);
    }
}
