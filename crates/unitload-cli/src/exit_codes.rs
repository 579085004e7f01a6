//! Exit codes for the unitload binary.
//!
//! Loader failures map through `LoaderError::exit_code`, so the values below
//! line up with it.

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1; // Bad flags or UNITLOAD_* values
pub const MANIFEST_ERROR: i32 = 2;
pub const FETCH_ERROR: i32 = 3;
pub const INSERTION_ERROR: i32 = 4;
pub const INTERNAL_ERROR: i32 = 70; // Output or runtime failure outside the loader

#[cfg(test)]
mod tests {
    use super::*;
    use unitload_core::LoaderError;

    #[test]
    fn test_loader_errors_map_to_documented_codes() {
        let cases = [
            (
                LoaderError::Config {
                    message: "x".into(),
                },
                CONFIG_ERROR,
            ),
            (
                LoaderError::Manifest {
                    location: "m".into(),
                    status: None,
                    reason: "x".into(),
                },
                MANIFEST_ERROR,
            ),
            (
                LoaderError::Fetch {
                    identifier: "a.js".into(),
                    status: Some(500),
                    cause: "x".into(),
                },
                FETCH_ERROR,
            ),
            (
                LoaderError::Insertion {
                    identifier: "a.js".into(),
                    reason: "x".into(),
                },
                INSERTION_ERROR,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }
}
