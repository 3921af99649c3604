//! Request validation
//!
//! Pure checks run before any cluster call so a rejected request never leaves
//! partial state behind.

use crate::error::StoreError;
use crate::models::{CreateInstanceRequest, UpdateCapacityRequest, non_empty};

/// Lowest accepted replica count (inclusive)
pub const MIN_REPLICAS: i64 = 1;
/// Highest accepted replica count (inclusive)
pub const MAX_REPLICAS: i64 = 9;

const BINARY_SUFFIXES: [&str; 6] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_SUFFIXES: [&str; 9] = ["n", "u", "m", "k", "M", "G", "T", "P", "E"];

/// Validate a create request.
///
/// Checks required fields, the instance name, the storage class, replica
/// bounds and every quantity-shaped field.
pub fn validate_create_request(request: &CreateInstanceRequest) -> Result<(), StoreError> {
    if request.name.is_empty() {
        return Err(StoreError::validation("name", "is required"));
    }
    validate_dns_label("name", &request.name)?;

    if request.capacity.is_empty() {
        return Err(StoreError::validation("capacity", "is required"));
    }

    validate_replicas("redisReplicas", request.redis_replicas)?;
    validate_replicas("sentinelReplicas", request.sentinel_replicas)?;

    validate_quantity("capacity", &request.capacity)?;
    let optional_quantities = [
        ("cpuRequest", &request.cpu_request),
        ("memoryRequest", &request.memory_request),
        ("cpuLimit", &request.cpu_limit),
        ("memoryLimit", &request.memory_limit),
    ];
    for (field, value) in optional_quantities {
        if let Some(qty) = non_empty(value.as_ref()) {
            validate_quantity(field, qty)?;
        }
    }

    if let Some(storage_class) = non_empty(request.storage_class.as_ref()) {
        validate_dns_subdomain("storageClass", storage_class)?;
    }

    Ok(())
}

/// Validate a capacity update request
pub fn validate_update_capacity_request(request: &UpdateCapacityRequest) -> Result<(), StoreError> {
    if request.capacity.is_empty() {
        return Err(StoreError::validation("capacity", "is required"));
    }
    validate_quantity("capacity", &request.capacity)?;

    if let Some(storage_class) = non_empty(request.storage_class.as_ref()) {
        validate_dns_subdomain("storageClass", storage_class)?;
    }
    Ok(())
}

/// Check an optional replica count lies within `[MIN_REPLICAS, MAX_REPLICAS]`
pub fn validate_replicas(field: &str, replicas: Option<i64>) -> Result<(), StoreError> {
    match replicas {
        Some(n) if !(MIN_REPLICAS..=MAX_REPLICAS).contains(&n) => Err(StoreError::validation(
            field,
            format!("must be between {} and {}, got {}", MIN_REPLICAS, MAX_REPLICAS, n),
        )),
        _ => Ok(()),
    }
}

/// Check a string follows the Kubernetes quantity grammar (e.g. "1Gi", "500m", "1e3")
pub fn validate_quantity(field: &str, qty: &str) -> Result<(), StoreError> {
    if is_valid_quantity(qty) {
        Ok(())
    } else {
        Err(StoreError::validation(
            field,
            format!("invalid quantity '{}' (expected e.g., '1Gi', '500m', '128Mi')", qty),
        ))
    }
}

/// Returns true when `qty` is `<sign?><number><suffix?>`.
///
/// The number is digits with an optional fractional part (".5" and "5." are
/// allowed); the suffix is binary, decimal SI, or a decimal exponent.
pub fn is_valid_quantity(qty: &str) -> bool {
    let unsigned = qty.strip_prefix(['+', '-']).unwrap_or(qty);
    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    is_valid_number(number) && is_valid_suffix(suffix)
}

fn is_valid_number(number: &str) -> bool {
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    match parts.next() {
        // No fractional part
        None => !whole.is_empty(),
        Some(fraction) => !fraction.contains('.') && (!whole.is_empty() || !fraction.is_empty()),
    }
}

fn is_valid_suffix(suffix: &str) -> bool {
    if suffix.is_empty()
        || BINARY_SUFFIXES.contains(&suffix)
        || DECIMAL_SUFFIXES.contains(&suffix)
    {
        return true;
    }

    // Decimal exponent: e|E followed by a signed integer
    match suffix.strip_prefix(['e', 'E']) {
        Some(exponent) => {
            let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Check a value is a DNS-1123 label: at most 63 lowercase alphanumerics or
/// '-', starting and ending with an alphanumeric.
pub fn validate_dns_label(field: &str, value: &str) -> Result<(), StoreError> {
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = !value.starts_with('-') && !value.ends_with('-');

    if value.is_empty() || value.len() > 63 || !valid_chars || !valid_edges {
        return Err(StoreError::validation(
            field,
            format!(
                "'{}' must be a DNS-1123 label \
                 (lowercase alphanumerics and '-', max 63 characters)",
                value
            ),
        ));
    }
    Ok(())
}

/// Check a value is a DNS-1123 subdomain: at most 253 characters of
/// dot-separated labels, each lowercase alphanumerics or '-' and starting and
/// ending with an alphanumeric.
pub fn validate_dns_subdomain(field: &str, value: &str) -> Result<(), StoreError> {
    let valid_labels = value.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    });

    if value.is_empty() || value.len() > 253 || !valid_labels {
        return Err(StoreError::validation(
            field,
            format!(
                "'{}' must be a DNS-1123 subdomain \
                 (lowercase alphanumerics, '-' and '.', max 253 characters)",
                value
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_accepts_canonical_forms() {
        for qty in [
            "1Gi", "500m", "128Mi", "1", "0.5", "2000m", "512Ki", "1M", "1e3", "1.5Gi", ".5",
            "+1Gi",
        ] {
            assert!(is_valid_quantity(qty), "expected '{}' to be valid", qty);
        }
    }

    #[test]
    fn test_quantity_rejects_malformed() {
        for qty in ["", "abc", "10Xi", "Gi", "1.2.3", "1 Gi", "1gi", "1e", "--1", "."] {
            assert!(!is_valid_quantity(qty), "expected '{}' to be invalid", qty);
        }
    }

    #[test]
    fn test_replica_bounds() {
        assert!(validate_replicas("redisReplicas", Some(1)).is_ok());
        assert!(validate_replicas("redisReplicas", Some(9)).is_ok());
        assert!(validate_replicas("redisReplicas", None).is_ok());
        assert!(validate_replicas("redisReplicas", Some(0)).is_err());
        assert!(validate_replicas("redisReplicas", Some(10)).is_err());
    }

    #[test]
    fn test_replica_error_is_field_tagged() {
        let err = validate_replicas("sentinelReplicas", Some(10)).unwrap_err();
        match err {
            StoreError::Validation { field, message } => {
                assert_eq!(field, "sentinelReplicas");
                assert!(message.contains("between 1 and 9"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_create_request_requires_name_and_capacity() {
        let missing_name = CreateInstanceRequest::new("", "1Gi");
        let missing_capacity = CreateInstanceRequest::new("cache", "");

        assert!(matches!(
            validate_create_request(&missing_name),
            Err(StoreError::Validation { field, .. }) if field == "name"
        ));
        assert!(matches!(
            validate_create_request(&missing_capacity),
            Err(StoreError::Validation { field, .. }) if field == "capacity"
        ));
    }

    #[test]
    fn test_create_request_checks_resource_quantities() {
        let mut request = CreateInstanceRequest::new("cache", "1Gi");
        request.memory_limit = Some("lots".to_string());

        assert!(matches!(
            validate_create_request(&request),
            Err(StoreError::Validation { field, .. }) if field == "memoryLimit"
        ));

        // Empty optional fields are treated as absent
        request.memory_limit = Some(String::new());
        assert!(validate_create_request(&request).is_ok());
    }

    #[test]
    fn test_create_request_rejects_bad_name() {
        let too_long = "a".repeat(64);
        for name in ["Cache", "my_cache", "-cache", "cache-", too_long.as_str()] {
            let request = CreateInstanceRequest::new(name, "1Gi");
            assert!(
                validate_create_request(&request).is_err(),
                "name '{}' should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_storage_class_must_be_dns_subdomain() {
        for class in ["premium-perf1-stackit", "fast", "ebs.csi.aws.com"] {
            let mut request = CreateInstanceRequest::new("cache", "1Gi");
            request.storage_class = Some(class.to_string());
            assert!(
                validate_create_request(&request).is_ok(),
                "class '{}' should be accepted",
                class
            );
        }

        let injected = "x\"\n    image: \"evil/redis:latest\"\n    junk: |\n      z: ";
        for class in ["fast\"ssd", injected, "Fast", "a..b", "-fast", "fast ssd"] {
            let mut request = CreateInstanceRequest::new("cache", "1Gi");
            request.storage_class = Some(class.to_string());
            assert!(matches!(
                validate_create_request(&request),
                Err(StoreError::Validation { field, .. }) if field == "storageClass"
            ));

            let update = UpdateCapacityRequest {
                capacity: "5Gi".to_string(),
                storage_class: Some(class.to_string()),
            };
            assert!(matches!(
                validate_update_capacity_request(&update),
                Err(StoreError::Validation { field, .. }) if field == "storageClass"
            ));
        }
    }

    #[test]
    fn test_update_request() {
        let ok = UpdateCapacityRequest {
            capacity: "5Gi".to_string(),
            storage_class: None,
        };
        let empty = UpdateCapacityRequest::default();
        let bad = UpdateCapacityRequest {
            capacity: "5 gigs".to_string(),
            storage_class: Some("fast".to_string()),
        };

        assert!(validate_update_capacity_request(&ok).is_ok());
        assert!(validate_update_capacity_request(&empty).is_err());
        assert!(validate_update_capacity_request(&bad).is_err());
    }
}
