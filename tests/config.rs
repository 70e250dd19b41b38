use std::fs;
use std::path::PathBuf;

use lazy_static::lazy_static;
use pretty_assertions::assert_eq;
use task_manager::config::{ConfigError, Settings};
use uuid::Uuid;

lazy_static! {
    static ref ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}

// Runs `test_logic` with the given variables set, restoring the previous
// values afterwards even if it panics.
fn run_with_env<F>(vars: &[(&str, &str)], test_logic: F)
where
    F: FnOnce(),
{
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let originals: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_logic));

    for (key, original) in originals {
        match original {
            Some(value) => std::env::set_var(&key, value),
            None => std::env::remove_var(&key),
        }
    }

    if let Err(panic_payload) = result {
        std::panic::resume_unwind(panic_payload);
    }
}

fn temp_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("task-manager-{}.env", Uuid::new_v4()));
    fs::write(&path, contents).expect("write override file");
    path
}

#[test]
fn test_override_file_beats_environment() {
    let path = temp_file("PROJECT_NAME=\"From File\"\nSERVER_PORT=9100\n");

    run_with_env(
        &[("PROJECT_NAME", "From Env"), ("API_V1_PREFIX", "/env/v1")],
        || {
            let settings = Settings::load_with_override(&path).unwrap();

            assert_eq!(settings.project_name, "From File");
            assert_eq!(settings.server_port, 9100);
            // Keys absent from the file still come from the environment.
            assert_eq!(settings.api_v1_prefix, "/env/v1");
        },
    );

    let _ = fs::remove_file(path);
}

#[test]
fn test_missing_override_file_is_ignored() {
    let path = std::env::temp_dir().join(format!("absent-{}.env", Uuid::new_v4()));

    run_with_env(&[("PROJECT_NAME", "Env Only")], || {
        let settings = Settings::load_with_override(&path).unwrap();
        assert_eq!(settings.project_name, "Env Only");
    });
}

#[test]
fn test_invalid_environment_value_aborts_loading() {
    let path = std::env::temp_dir().join(format!("absent-{}.env", Uuid::new_v4()));

    run_with_env(&[("DEBUG", "maybe")], || {
        match Settings::load_with_override(&path) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "DEBUG"),
            other => panic!("expected DEBUG to be rejected, got {:?}", other),
        }
    });
}

#[test]
fn test_malformed_override_file_is_reported() {
    let path = temp_file("PROJECT_NAME=ok\nthis line has no assignment\n");

    run_with_env(&[], || {
        let err = Settings::load_with_override(&path).unwrap_err();
        assert!(matches!(err, ConfigError::OverrideFile { .. }), "{:?}", err);
        assert!(err.to_string().contains("task-manager-"));
    });

    let _ = fs::remove_file(path);
}

#[test]
fn test_values_with_spaces_must_be_quoted() {
    let unquoted = temp_file("PROJECT_NAME=From File\n");
    let quoted = temp_file("PROJECT_NAME='From File'\n");

    run_with_env(&[], || {
        assert!(matches!(
            Settings::load_with_override(&unquoted),
            Err(ConfigError::OverrideFile { .. })
        ));
        assert_eq!(
            Settings::load_with_override(&quoted).unwrap().project_name,
            "From File"
        );
    });

    let _ = fs::remove_file(unquoted);
    let _ = fs::remove_file(quoted);
}
