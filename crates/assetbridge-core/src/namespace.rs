//! Identifier namespacing across domains.
//!
//! Two domains share no naming authority, so an object leaving its home
//! domain is re-keyed as `<endpoint>/<id>`. The same object from the same
//! origin always maps to the same key.
//!
//! Endpoints are typically URLs and contain the separator themselves. Parsing
//! splits on the *last* separator, and object ids are required to be
//! separator-free, so the endpoint string is always recovered exactly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Endpoint, ObjectId};

/// Separator between endpoint and object id.
pub const SEPARATOR: char = '/';

/// An object id qualified with the endpoint of the domain it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedId {
    endpoint: Endpoint,
    id: ObjectId,
}

impl QualifiedId {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn into_parts(self) -> (Endpoint, ObjectId) {
        (self.endpoint, self.id)
    }

    /// The qualified form as a storage key.
    pub fn to_object_id(&self) -> ObjectId {
        ObjectId::new(self.to_string())
    }

    /// Parse a qualified identifier. Same as [`unqualify`], keeping the pair.
    pub fn parse(qualified: &str) -> Result<Self> {
        let (endpoint, id) = unqualify(qualified)?;
        Ok(Self { endpoint, id })
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.endpoint, SEPARATOR, self.id)
    }
}

impl FromStr for QualifiedId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Qualify `id` with `endpoint`.
///
/// Fails with `InvalidIdentifier` if either part is empty, and with
/// `MalformedIdentifier` if `id` already contains the separator (it is
/// already qualified, or could not be parsed back unambiguously).
pub fn qualify(endpoint: &Endpoint, id: &ObjectId) -> Result<QualifiedId> {
    if endpoint.is_empty() {
        return Err(CoreError::InvalidIdentifier("empty endpoint".into()));
    }
    if id.is_empty() {
        return Err(CoreError::InvalidIdentifier("empty object id".into()));
    }
    if id.as_str().contains(SEPARATOR) {
        return Err(CoreError::MalformedIdentifier(format!(
            "object id {} contains '{}'",
            id, SEPARATOR
        )));
    }

    Ok(QualifiedId {
        endpoint: endpoint.clone(),
        id: id.clone(),
    })
}

/// Split a qualified identifier back into `(endpoint, id)`.
pub fn unqualify(qualified: &str) -> Result<(Endpoint, ObjectId)> {
    let (endpoint, id) = qualified.rsplit_once(SEPARATOR).ok_or_else(|| {
        CoreError::MalformedIdentifier(format!("{} has no '{}'", qualified, SEPARATOR))
    })?;

    if endpoint.is_empty() {
        return Err(CoreError::MalformedIdentifier(format!(
            "{} has an empty endpoint",
            qualified
        )));
    }
    if id.is_empty() {
        return Err(CoreError::MalformedIdentifier(format!(
            "{} has an empty object id",
            qualified
        )));
    }

    Ok((Endpoint::new(endpoint), ObjectId::new(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_qualify_format() {
        let q = qualify(
            &Endpoint::new("http://grid.example:8003"),
            &ObjectId::new("0b5e0b4c-7a0a-4b8e-9a6f-2d1f3c4b5a69"),
        )
        .unwrap();
        assert_eq!(
            q.to_string(),
            "http://grid.example:8003/0b5e0b4c-7a0a-4b8e-9a6f-2d1f3c4b5a69"
        );
    }

    #[test]
    fn test_qualify_rejects_empty_parts() {
        let err = qualify(&Endpoint::new(""), &ObjectId::new("a")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier(_)));

        let err = qualify(&Endpoint::new("http://x"), &ObjectId::new("")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_requalifying_is_malformed() {
        let ep = Endpoint::new("http://a");
        let once = qualify(&ep, &ObjectId::new("x")).unwrap().to_object_id();
        let err = qualify(&Endpoint::new("http://b"), &once).unwrap_err();
        assert!(matches!(err, CoreError::MalformedIdentifier(_)));
    }

    #[test]
    fn test_unqualify_errors() {
        assert!(matches!(
            unqualify("no-separator"),
            Err(CoreError::MalformedIdentifier(_))
        ));
        assert!(matches!(
            unqualify("/id-only"),
            Err(CoreError::MalformedIdentifier(_))
        ));
        assert!(matches!(
            unqualify("http://grid/"),
            Err(CoreError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_trailing_slash_endpoint_is_preserved() {
        let ep = Endpoint::new("http://grid:8003/");
        let q = qualify(&ep, &ObjectId::new("abc")).unwrap();
        let (endpoint, id) = unqualify(&q.to_string()).unwrap();
        assert_eq!(endpoint, ep);
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_from_str() {
        let q: QualifiedId = "http://grid/assets/abc".parse().unwrap();
        assert_eq!(q.endpoint().as_str(), "http://grid/assets");
        assert_eq!(q.id().as_str(), "abc");
    }

    proptest! {
        #[test]
        fn qualify_unqualify_roundtrip(
            endpoint in "[ -~]{1,48}",
            id in "[!-.0-~]{1,40}",
        ) {
            let endpoint = Endpoint::new(endpoint);
            let id = ObjectId::new(id);

            let q = qualify(&endpoint, &id).unwrap();
            let (e2, i2) = unqualify(&q.to_string()).unwrap();

            prop_assert_eq!(e2, endpoint);
            prop_assert_eq!(i2, id);
        }
    }
}
