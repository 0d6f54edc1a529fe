//! Prometheus text exposition format.
//!
//! One series per registered service, labelled with `service` and `kind`.

use std::fmt::Write;

use svcwatch_health::ServiceInfo;

/// Render service availability into Prometheus text format.
pub fn render_prometheus(services: &[ServiceInfo]) -> String {
    let mut out = String::new();

    out.push_str("# HELP svcwatch_service_up Whether the service is available (1) or not (0).\n");
    out.push_str("# TYPE svcwatch_service_up gauge\n");
    for s in services {
        let _ = writeln!(
            out,
            "svcwatch_service_up{{{}}} {}",
            labels(s),
            u8::from(s.available)
        );
    }

    out.push_str("# HELP svcwatch_service_starting Whether the service appears to be starting.\n");
    out.push_str("# TYPE svcwatch_service_starting gauge\n");
    for s in services {
        let starting = s.last_status.as_ref().is_some_and(|st| st.is_starting);
        let _ = writeln!(
            out,
            "svcwatch_service_starting{{{}}} {}",
            labels(s),
            u8::from(starting)
        );
    }

    out.push_str(
        "# HELP svcwatch_service_last_checked_seconds Unix time of the last completed check.\n",
    );
    out.push_str("# TYPE svcwatch_service_last_checked_seconds gauge\n");
    for s in services {
        if let Some(status) = &s.last_status {
            let _ = writeln!(
                out,
                "svcwatch_service_last_checked_seconds{{{}}} {}",
                labels(s),
                status.last_checked.timestamp()
            );
        }
    }

    out.push_str(
        "# HELP svcwatch_service_transitions_total Availability changes since registration.\n",
    );
    out.push_str("# TYPE svcwatch_service_transitions_total counter\n");
    for s in services {
        let _ = writeln!(
            out,
            "svcwatch_service_transitions_total{{{}}} {}",
            labels(s),
            s.transitions
        );
    }

    out
}

fn labels(s: &ServiceInfo) -> String {
    format!("service=\"{}\",kind=\"{}\"", escape(&s.name), s.kind)
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
