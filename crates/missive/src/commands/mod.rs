//! CLI subcommand implementations.

use std::collections::HashMap;

use anyhow::Result;

pub mod check;
pub mod export;
pub mod init;
pub mod list;
pub mod preview;
pub mod render;
pub mod send;

/// Parse repeated `key=value` arguments into a props map.
pub(crate) fn parse_props(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut props = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("Invalid prop '{pair}', expected key=value");
        };
        props.insert(key.to_string(), value.to_string());
    }
    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        let props = parse_props(&["userName=Ada".to_string(), "plan=pro".to_string()]).unwrap();

        assert_eq!(props.get("userName").map(String::as_str), Some("Ada"));
        assert_eq!(props.get("plan").map(String::as_str), Some("pro"));
    }

    #[test]
    fn value_may_contain_equals() {
        let props = parse_props(&["query=a=b".to_string()]).unwrap();
        assert_eq!(props.get("query").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn rejects_pairs_without_equals() {
        assert!(parse_props(&["nope".to_string()]).is_err());
    }
}
