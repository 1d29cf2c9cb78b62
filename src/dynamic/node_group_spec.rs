use crate::dynamic::{null_as_default, ValidationError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// How capacity is removed from a node group when it scales down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ScaleDownPolicy {
    Delete,
    Deallocate,
}

impl Default for ScaleDownPolicy {
    fn default() -> Self {
        ScaleDownPolicy::Delete
    }
}

/// Specification of a node group to be auto-scaled.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroupSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub min_size: i32,
    #[serde(default)]
    pub max_size: i32,
    /// `None` when the source did not name a policy; see [`Self::effective_scale_down_policy`].
    #[serde(default, deserialize_with = "deserialize_scale_down_policy")]
    pub scale_down_policy: Option<ScaleDownPolicy>,
    /// Raw `key=value:Effect,...` form, same as kubelet's `--register-with-taints`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub taints: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip)]
    pub support_scale_to_zero: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("error while parsing NodeGroupSpec: {value}, {kind}")]
pub struct ParseError {
    pub value: String,
    pub kind: ParseErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("wrong nodes configuration")]
    Malformed,
    #[error("failed to set min size: {0}, expected integer")]
    MinSize(String),
    #[error("failed to set max size: {0}, expected integer")]
    MaxSize(String),
    #[error("failed to set scale down policy: {0}. Valid values are: Delete, Deallocate")]
    ScaleDownPolicy(String),
    #[error("invalid labels: {0}")]
    Labels(String),
    #[error("invalid node group spec: {}", .0.reason)]
    Invalid(ValidationError),
}

impl NodeGroupSpec {
    /// Parses `<min>:<max>:<name>` or `<min>:<max>:<policy>:<name>[:<labels>|<taints>]`.
    pub fn parse(value: &str, support_scale_to_zero: bool) -> Result<Self, ParseError> {
        let fail = |kind| ParseError {
            value: value.to_owned(),
            kind,
        };

        let tokens: Vec<&str> = value.splitn(5, ':').collect();
        let (min, max, policy, name, labels_taints) = match tokens.as_slice() {
            [min, max, name] => (*min, *max, None, *name, None),
            [min, max, policy, name] => (*min, *max, Some(*policy), *name, None),
            [min, max, policy, name, rest] => (*min, *max, Some(*policy), *name, Some(*rest)),
            _ => return Err(fail(ParseErrorKind::Malformed)),
        };

        let mut spec = NodeGroupSpec {
            name: name.to_owned(),
            min_size: min
                .parse()
                .map_err(|_| fail(ParseErrorKind::MinSize(min.to_owned())))?,
            max_size: max
                .parse()
                .map_err(|_| fail(ParseErrorKind::MaxSize(max.to_owned())))?,
            support_scale_to_zero,
            ..Default::default()
        };

        if let Some(policy) = policy {
            spec.scale_down_policy = Some(
                policy
                    .parse()
                    .map_err(|_| fail(ParseErrorKind::ScaleDownPolicy(policy.to_owned())))?,
            );
        }

        spec.validate()
            .map_err(|e| fail(ParseErrorKind::Invalid(e)))?;

        if let Some(labels_taints) = labels_taints {
            let mut parts = labels_taints.splitn(2, '|');
            let labels = parts.next().unwrap_or_default();

            spec.labels = serde_json::from_str::<Option<BTreeMap<String, String>>>(labels)
                .map_err(|e| fail(ParseErrorKind::Labels(e.to_string())))?
                .unwrap_or_default();
            spec.taints = parts.next().unwrap_or_default().to_owned();
        }

        debug!(
            name = spec.name.as_str(),
            min_size = spec.min_size,
            max_size = spec.max_size,
            taints = spec.taints.as_str(),
            support_scale_to_zero = spec.support_scale_to_zero,
            "Parsed node group spec"
        );

        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| Err(ValidationError::new(self.name.as_str(), reason));

        if self.support_scale_to_zero {
            if self.min_size < 0 {
                return invalid("min size must be >= 0");
            }
        } else if self.min_size <= 0 {
            return invalid("min size must be >= 1");
        }

        if self.max_size < self.min_size {
            return invalid("max size must be greater or equal to min size");
        }

        if self.name.is_empty() {
            return invalid("name must not be blank");
        }

        Ok(())
    }

    pub fn effective_scale_down_policy(&self) -> ScaleDownPolicy {
        self.scale_down_policy.unwrap_or_default()
    }

    /// Renders the extended form, `<min>:<max>:<policy>:<name>:<labels>|<taints>`.
    pub fn to_compact_string(&self) -> String {
        let labels = serde_json::to_string(&self.labels).unwrap_or_else(|_| "{}".to_owned());

        format!("{}:{}|{}", self, labels, self.taints)
    }
}

impl fmt::Display for NodeGroupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.min_size,
            self.max_size,
            self.effective_scale_down_policy(),
            self.name
        )
    }
}

fn deserialize_scale_down_policy<'de, D>(deserializer: D) -> Result<Option<ScaleDownPolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(v) if !v.is_empty() => v
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(ParseErrorKind::ScaleDownPolicy(v.clone()))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_form() -> Result<(), Box<dyn std::error::Error>> {
        let spec = NodeGroupSpec::parse("1:50:aks-nodepool-1", false)?;

        assert_eq!(1, spec.min_size);
        assert_eq!(50, spec.max_size);
        assert_eq!("aks-nodepool-1", spec.name);
        assert_eq!(None, spec.scale_down_policy);
        assert_eq!(ScaleDownPolicy::Delete, spec.effective_scale_down_policy());
        assert!(spec.labels.is_empty());
        assert_eq!("", spec.taints);

        Ok(())
    }

    #[test]
    fn test_extended_form() -> Result<(), Box<dyn std::error::Error>> {
        let spec = NodeGroupSpec::parse("1:50:Delete:aks-nodepool-1:{}|", false)?;

        assert_eq!(1, spec.min_size);
        assert_eq!(50, spec.max_size);
        assert_eq!("aks-nodepool-1", spec.name);
        assert_eq!(Some(ScaleDownPolicy::Delete), spec.scale_down_policy);
        assert!(spec.labels.is_empty());
        assert_eq!("", spec.taints);

        Ok(())
    }

    #[test]
    fn test_labels_and_taints() -> Result<(), Box<dyn std::error::Error>> {
        let spec = NodeGroupSpec::parse(
            r#"0:10:Deallocate:gpu:{"pool":"gpu","tier":"a"}|dedicated=gpu:NoSchedule,team=ml:NoExecute"#,
            true,
        )?;

        assert_eq!(0, spec.min_size);
        assert_eq!(Some(ScaleDownPolicy::Deallocate), spec.scale_down_policy);
        assert_eq!(Some(&"gpu".to_owned()), spec.labels.get("pool"));
        assert_eq!(Some(&"a".to_owned()), spec.labels.get("tier"));
        assert_eq!("dedicated=gpu:NoSchedule,team=ml:NoExecute", spec.taints);

        Ok(())
    }

    #[test]
    fn test_bad_policy() {
        let err = NodeGroupSpec::parse("1:50:BadPolicy:name", false).unwrap_err();

        assert_eq!(
            ParseErrorKind::ScaleDownPolicy("BadPolicy".to_owned()),
            err.kind
        );
        assert!(err
            .to_string()
            .contains("Valid values are: Delete, Deallocate"));
    }

    #[test]
    fn test_malformed_values() {
        let cases = vec![
            ("1:50", ParseErrorKind::Malformed),
            ("x:50:name", ParseErrorKind::MinSize("x".into())),
            ("1:y:Delete:name", ParseErrorKind::MaxSize("y".into())),
        ];

        for (value, expected) in cases {
            let err = NodeGroupSpec::parse(value, false).unwrap_err();
            assert_eq!(expected, err.kind, "{}", value);
        }

        let err = NodeGroupSpec::parse("1:50:Delete:name:{not json}|", false).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Labels(_)));
    }

    #[test]
    fn test_size_constraints() {
        let err = NodeGroupSpec::parse("0:5:name", false).unwrap_err();
        assert_eq!("min size must be >= 1", invalid_reason(&err));

        let err = NodeGroupSpec::parse("-1:5:name", true).unwrap_err();
        assert_eq!("min size must be >= 0", invalid_reason(&err));

        let err = NodeGroupSpec::parse("10:5:Delete:name", false).unwrap_err();
        assert_eq!(
            "max size must be greater or equal to min size",
            invalid_reason(&err)
        );

        let err = NodeGroupSpec::parse("1:5:", false).unwrap_err();
        assert_eq!("name must not be blank", invalid_reason(&err));

        assert!(NodeGroupSpec::parse("0:5:name", true).is_ok());
    }

    #[test]
    fn test_validate() {
        let spec = NodeGroupSpec {
            name: "".into(),
            min_size: 1,
            max_size: 50,
            ..Default::default()
        };
        assert_eq!(
            "name must not be blank",
            spec.validate().unwrap_err().reason
        );

        let spec = NodeGroupSpec {
            name: "g".into(),
            min_size: 100,
            max_size: 50,
            ..Default::default()
        };
        let err = spec.validate().unwrap_err();
        assert_eq!("g", err.group_name);
        assert_eq!(
            "invalid nodeGroup: g, max size must be greater or equal to min size",
            err.to_string()
        );
    }

    #[test]
    fn test_compact_string_canonicalizes() -> Result<(), Box<dyn std::error::Error>> {
        let cases = vec![
            ("1:50:aks-nodepool-1", "1:50:Delete:aks-nodepool-1:{}|"),
            ("1:50:Deallocate:pool", "1:50:Deallocate:pool:{}|"),
            (
                r#"2:3:Delete:pool:{"b":"2","a":"1"}|k=v:NoSchedule"#,
                r#"2:3:Delete:pool:{"a":"1","b":"2"}|k=v:NoSchedule"#,
            ),
        ];

        for (input, canonical) in cases {
            let spec = NodeGroupSpec::parse(input, false)?;
            let serialized = spec.to_compact_string();
            assert_eq!(canonical, serialized);

            let reparsed = NodeGroupSpec::parse(&serialized, false)?;
            assert_eq!(serialized, reparsed.to_compact_string());
            assert_eq!(spec.labels, reparsed.labels);
            assert_eq!(spec.taints, reparsed.taints);
        }

        Ok(())
    }

    fn invalid_reason(err: &ParseError) -> &str {
        match &err.kind {
            ParseErrorKind::Invalid(e) => e.reason.as_str(),
            other => panic!("unexpected error kind {:?}", other),
        }
    }
}
