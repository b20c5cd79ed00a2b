//! Structural merge of template documents
//!
//! Base templates are merged *underneath* the template that references them:
//! the referencing (child) document keeps every value it sets, and the
//! ancestor only contributes what the child leaves out.
//!
//! ## Rules
//!
//! - Mappings merge recursively, key by key
//! - Two sequences concatenate, ancestor entries first
//! - Any other combination keeps the child value
//! - Keys only present in the ancestor are added to the child
//!
//! Merging operates on raw documents (`serde_yaml::Value`), so keys the
//! configuration schema doesn't model are carried along like any other.
//! Callers strip `base` first ([`without_base`]) and inline provision files,
//! which leaves no field whose shorthand and structured forms could meet.

use log::trace;
use serde_yaml::Value as YamlValue;

/// `document` with its top-level `base` key removed.
pub fn without_base(mut document: YamlValue) -> YamlValue {
    if let Some(map) = document.as_mapping_mut() {
        map.remove("base");
    }
    document
}

/// Merges `ancestor` underneath `child`, in place.
///
/// `path` is only used for trace logging; pass `""` at the root.
pub fn merge_underneath(child: &mut YamlValue, ancestor: YamlValue, path: &str) {
    if child.is_null() {
        *child = ancestor;
        return;
    }
    match (child, ancestor) {
        (YamlValue::Mapping(child_map), YamlValue::Mapping(ancestor_map)) => {
            for (key, value) in ancestor_map {
                let key_str = match &key {
                    YamlValue::String(s) => s.clone(),
                    _ => format!("{:?}", key),
                };
                let new_path = if path.is_empty() {
                    key_str
                } else {
                    format!("{}.{}", path, key_str)
                };

                match child_map.get_mut(&key) {
                    Some(existing) => merge_underneath(existing, value, &new_path),
                    None => {
                        child_map.insert(key, value);
                    }
                }
            }
        }
        (YamlValue::Sequence(child_seq), YamlValue::Sequence(mut ancestor_seq)) => {
            trace!(
                "Prepending {} inherited entries at '{}'",
                ancestor_seq.len(),
                path
            );
            ancestor_seq.append(child_seq);
            *child_seq = ancestor_seq;
        }
        (child, ancestor) => {
            trace!(
                "Keeping {} at '{}' over inherited {}",
                type_name(child),
                path,
                type_name(&ancestor)
            );
        }
    }
}

/// Human-readable type name of a YAML value, for log messages.
pub fn type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> YamlValue {
        serde_yaml::from_str(s).unwrap()
    }

    fn merged(child: &str, ancestor: &str) -> YamlValue {
        let mut child = yaml(child);
        merge_underneath(&mut child, yaml(ancestor), "");
        child
    }

    #[test]
    fn test_without_base_keeps_other_keys() {
        let document = without_base(yaml("base: parent\nvideo: {display: vnc}\n"));
        assert_eq!(document, yaml("video: {display: vnc}\n"));
    }

    #[test]
    fn test_child_scalars_win() {
        let result = merged("cpus: 4\n", "cpus: 2\nmemory: 4GiB\n");
        assert_eq!(result, yaml("cpus: 4\nmemory: 4GiB\n"));
    }

    #[test]
    fn test_nested_mappings_merge_recursively() {
        let result = merged(
            "ssh:\n  localPort: 60022\n",
            "ssh:\n  localPort: 22\n  forwardAgent: true\n",
        );
        assert_eq!(result["ssh"]["localPort"], YamlValue::Number(60022.into()));
        assert_eq!(result["ssh"]["forwardAgent"], YamlValue::Bool(true));
    }

    #[test]
    fn test_sequences_concatenate_ancestor_first() {
        let result = merged(
            "mounts:\n- location: /child\n",
            "mounts:\n- location: /base1\n- location: /base2\n",
        );
        let locations: Vec<_> = result["mounts"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|m| m["location"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(locations, vec!["/base1", "/base2", "/child"]);
    }

    #[test]
    fn test_type_mismatch_keeps_child() {
        let result = merged("dns: none\n", "dns:\n- 1.1.1.1\n");
        assert_eq!(result["dns"], YamlValue::String("none".to_string()));

        let result = merged("ssh: false\n", "ssh:\n  localPort: 22\n");
        assert_eq!(result["ssh"], YamlValue::Bool(false));
    }

    #[test]
    fn test_null_child_takes_ancestor() {
        let mut child = YamlValue::Null;
        merge_underneath(&mut child, yaml("cpus: 2\n"), "");
        assert_eq!(child, yaml("cpus: 2\n"));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(&yaml("[1]")), "Sequence");
        assert_eq!(type_name(&yaml("a: 1")), "Mapping");
        assert_eq!(type_name(&YamlValue::Null), "Null");
    }
}
