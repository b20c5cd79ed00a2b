//! # Template Schema
//!
//! This module defines the in-memory form of a VM instance template. Only
//! the fields the composer and the default filler need are modelled; other
//! keys are dropped by the lenient decode and reported by the strict one.
//!
//! ## Scalar-or-structured fields
//!
//! Some fields accept either a bare scalar or their full structured form:
//!
//! - a **disk** (`additionalDisks` entries) is a name or a descriptor,
//! - **`base`** is a single URL or a list of locators,
//! - a **locator** (`base` entries, `provision[].file`) is a URL or a
//!   `{url, digest}` mapping.
//!
//! Each occurrence is decoded on its own: a scalar is turned into the
//! canonical structured value (`"foo"` becomes `{name: foo}` for a disk,
//! `[{url: x}]` for `base`), anything else goes through the structural
//! decoder. Downstream code only ever sees the structured form.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::digest::Digest;
use crate::error::Result;

/// A decoded template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Templates merged underneath this one, in priority order.
    #[serde(skip_serializing_if = "BaseTemplates::is_empty")]
    pub base: BaseTemplates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_disks: Vec<Disk>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<Ssh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containerd: Option<Containerd>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provision: Vec<Provision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<Probe>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub port_forwards: Vec<PortForward>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<Network>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub param: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// An additional disk attached to the instance.
///
/// Accepts a bare disk name or a full descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fs_args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ssh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
    #[serde(rename = "loadDotSSHPubKeys", skip_serializing_if = "Option::is_none")]
    pub load_dot_ssh_pub_keys: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_agent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Containerd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<bool>,
}

/// A provisioning script, given inline or by locator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<LocatorWithDigest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortForward {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_socket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_socket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Network {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// A reference to another document, optionally pinned by digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct LocatorWithDigest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl LocatorWithDigest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            digest: None,
        }
    }

    /// Parses the declared digest, if any.
    pub fn parsed_digest(&self) -> Result<Option<Digest>> {
        self.digest.as_deref().map(str::parse).transpose()
    }
}

/// The `base` field: ordered references to ancestor templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BaseTemplates(pub Vec<LocatorWithDigest>);

impl BaseTemplates {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocatorWithDigest> {
        self.0.iter()
    }
}

impl From<Vec<LocatorWithDigest>> for BaseTemplates {
    fn from(entries: Vec<LocatorWithDigest>) -> Self {
        Self(entries)
    }
}

/// Types that accept a bare scalar in place of their structured form.
trait ScalarOrStructured: Sized {
    const EXPECTING: &'static str;

    /// Canonical value for a scalar.
    fn from_scalar(value: String) -> Self;

    /// Full structural decode, used whenever the value is not a scalar.
    fn from_structured<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error>;

    /// Value for an explicit null, if nulls are accepted.
    fn from_null() -> Option<Self> {
        None
    }
}

impl ScalarOrStructured for Disk {
    const EXPECTING: &'static str = "a disk name or a disk descriptor";

    fn from_scalar(name: String) -> Self {
        Disk {
            name,
            ..Default::default()
        }
    }

    fn from_structured<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Inherent function generated by `serde(remote = "Self")`.
        Disk::deserialize(deserializer)
    }
}

impl ScalarOrStructured for LocatorWithDigest {
    const EXPECTING: &'static str = "a URL or a {url, digest} mapping";

    fn from_scalar(url: String) -> Self {
        LocatorWithDigest::new(url)
    }

    fn from_structured<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        LocatorWithDigest::deserialize(deserializer)
    }
}

impl ScalarOrStructured for BaseTemplates {
    const EXPECTING: &'static str = "a base template URL or a list of base templates";

    fn from_scalar(url: String) -> Self {
        BaseTemplates(vec![LocatorWithDigest::new(url)])
    }

    fn from_structured<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<LocatorWithDigest>::deserialize(deserializer).map(BaseTemplates)
    }

    fn from_null() -> Option<Self> {
        Some(BaseTemplates::default())
    }
}

struct ScalarOrStructuredVisitor<T>(PhantomData<T>);

impl<'de, T: ScalarOrStructured> Visitor<'de> for ScalarOrStructuredVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(T::EXPECTING)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<T, E> {
        Ok(T::from_scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<T, E> {
        Ok(T::from_scalar(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<T, E> {
        Ok(T::from_scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<T, E> {
        Ok(T::from_scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<T, E> {
        Ok(T::from_scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<T, E> {
        Ok(T::from_scalar(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<T, E> {
        T::from_null().ok_or_else(|| E::invalid_type(Unexpected::Unit, &self))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<T, E> {
        self.visit_unit()
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<T, A::Error> {
        T::from_structured(MapAccessDeserializer::new(map))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> std::result::Result<T, A::Error> {
        T::from_structured(SeqAccessDeserializer::new(seq))
    }
}

fn deserialize_scalar_or_structured<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: ScalarOrStructured,
{
    deserializer.deserialize_any(ScalarOrStructuredVisitor(PhantomData))
}

impl<'de> Deserialize<'de> for Disk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_scalar_or_structured(deserializer)
    }
}

impl Serialize for Disk {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Disk::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for LocatorWithDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_scalar_or_structured(deserializer)
    }
}

impl Serialize for LocatorWithDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        LocatorWithDigest::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for BaseTemplates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_scalar_or_structured(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_scalar_disk_matches_descriptor() {
        let scalar = parse("additionalDisks: [foo]\n");
        let structured = parse("additionalDisks:\n- name: foo\n");
        assert_eq!(scalar.additional_disks, structured.additional_disks);
        assert_eq!(scalar.additional_disks[0].name, "foo");
        assert_eq!(scalar.additional_disks[0].format, None);
    }

    #[test]
    fn test_disks_decode_independently() {
        let config = parse(
            r#"
additionalDisks:
- data
- name: scratch
  format: true
  fsType: ext4
  fsArgs: ["-L", "scratch"]
"#,
        );
        assert_eq!(config.additional_disks.len(), 2);
        assert_eq!(config.additional_disks[0], Disk::from_scalar("data".to_string()));
        assert_eq!(config.additional_disks[1].name, "scratch");
        assert_eq!(config.additional_disks[1].format, Some(true));
        assert_eq!(config.additional_disks[1].fs_type.as_deref(), Some("ext4"));
        assert_eq!(config.additional_disks[1].fs_args, vec!["-L", "scratch"]);
    }

    #[test]
    fn test_scalar_base_matches_list() {
        let scalar = parse("base: x\n");
        let structured = parse("base:\n- url: x\n");
        assert_eq!(scalar.base, structured.base);
        assert_eq!(scalar.base, BaseTemplates(vec![LocatorWithDigest::new("x")]));
    }

    #[test]
    fn test_base_list_mixes_scalars_and_mappings() {
        let config = parse(
            r#"
base:
- template://_images/ubuntu
- url: https://example.com/base.yaml
  digest: sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
"#,
        );
        assert_eq!(config.base.len(), 2);
        assert_eq!(config.base.0[0].url, "template://_images/ubuntu");
        assert_eq!(config.base.0[0].digest, None);
        assert_eq!(config.base.0[1].url, "https://example.com/base.yaml");
        assert!(config.base.0[1].parsed_digest().unwrap().is_some());
    }

    #[test]
    fn test_null_base_is_empty() {
        let config = parse("base: ~\ncpus: 2\n");
        assert!(config.base.is_empty());
        assert_eq!(config.cpus, Some(2));
    }

    #[test]
    fn test_base_mapping_is_rejected() {
        let result = serde_yaml::from_str::<Config>("base:\n  url: x\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_provision_file_accepts_both_shapes() {
        let config = parse(
            r#"
provision:
- mode: system
  file: scripts/setup.sh
- mode: user
  file:
    url: scripts/user.sh
    digest: sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
- mode: system
  script: echo hi
"#,
        );
        assert_eq!(
            config.provision[0].file,
            Some(LocatorWithDigest::new("scripts/setup.sh"))
        );
        assert!(config.provision[1].file.as_ref().unwrap().digest.is_some());
        assert_eq!(config.provision[2].script.as_deref(), Some("echo hi"));
    }

    #[test]
    fn test_serialize_canonical_form() {
        let config = parse("base: x\nadditionalDisks: [foo]\n");
        let yaml = serde_yaml::to_string(&config).unwrap();
        let expected = parse("base:\n- url: x\nadditionalDisks:\n- name: foo\n");
        assert_eq!(serde_yaml::to_string(&expected).unwrap(), yaml);
        assert!(yaml.contains("url: x"));
        assert!(yaml.contains("name: foo"));
        assert!(!yaml.contains("digest"));
    }

    #[test]
    fn test_unknown_fields_are_ignored_leniently() {
        let config = parse("cpus: 4\ncpu: 8\n");
        assert_eq!(config.cpus, Some(4));
    }
}
