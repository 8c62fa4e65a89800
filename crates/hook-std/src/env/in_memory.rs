#[cfg(any(test, feature = "test-support"))]
use std::collections::HashMap;
#[cfg(any(test, feature = "test-support"))]
use std::env;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Mutex;

#[cfg(any(test, feature = "test-support"))]
use super::ReadEnv;

/// Environment double that never touches the process environment.
///
/// All methods take `&self`; the map sits behind a `Mutex` so one instance can
/// be shared with spawned tasks.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct InMemoryEnv {
    vars: Mutex<HashMap<String, String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl InMemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(key.into(), value.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.vars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ReadEnv for InMemoryEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        self.lock().get(key).cloned().ok_or(env::VarError::NotPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_read() {
        let env = InMemoryEnv::new();
        env.set("GITEE_TOPIC", "gitee-events");

        assert_eq!(env.var("GITEE_TOPIC").unwrap(), "gitee-events");
    }

    #[test]
    fn unset_key_is_not_present() {
        let env = InMemoryEnv::new();

        assert!(matches!(env.var("NOPE"), Err(env::VarError::NotPresent)));
    }

    #[test]
    fn set_overwrites_previous_value() {
        let env = InMemoryEnv::new();
        env.set("KEY", "old");
        env.set("KEY", "new");

        assert_eq!(env.var("KEY").unwrap(), "new");
    }

    #[test]
    fn parsed_trims_and_rejects_garbage() {
        let env = InMemoryEnv::new();
        env.set("PORT", " 9090 ");
        env.set("BAD", "ninety");

        assert_eq!(env.parsed::<u16>("PORT"), Some(9090));
        assert_eq!(env.parsed::<u16>("BAD"), None);
    }

    #[test]
    fn flag_accepts_common_spellings() {
        let env = InMemoryEnv::new();
        env.set("A", "TRUE");
        env.set("B", "0");
        env.set("C", "maybe");

        assert_eq!(env.flag("A"), Some(true));
        assert_eq!(env.flag("B"), Some(false));
        assert_eq!(env.flag("C"), None);
        assert_eq!(env.flag("MISSING"), None);
    }

    #[test]
    fn shareable_across_threads() {
        let env = std::sync::Arc::new(InMemoryEnv::new());
        let writer = std::sync::Arc::clone(&env);

        std::thread::spawn(move || writer.set("FROM_THREAD", "yes"))
            .join()
            .unwrap();

        assert_eq!(env.var("FROM_THREAD").unwrap(), "yes");
    }
}
