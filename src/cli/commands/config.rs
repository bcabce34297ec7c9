use anyhow::Result;

use crate::domain::models::Config;

/// Handle config command
pub fn execute(config: &Config, json: bool) -> Result<()> {
    println!("{}", render(config, json)?);
    Ok(())
}

fn render(config: &Config, json: bool) -> Result<String> {
    let rendered = if json {
        serde_json::to_string_pretty(config)?
    } else {
        serde_yaml::to_string(config)?
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_yaml_round_trips() {
        let rendered = render(&Config::default(), false).unwrap();
        assert!(rendered.contains("stall_threshold_secs: 30"));

        let parsed: Config = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed.coordination.max_stalls, 3);
    }

    #[test]
    fn test_render_json() {
        let rendered = render(&Config::default(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["coordination"]["heartbeat_interval_secs"], 10);
    }
}
