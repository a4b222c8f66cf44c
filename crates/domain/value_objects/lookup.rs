/// Outcome of a best-effort read against the cache or the billing provider.
///
/// Callers pick their own fallback: the access check treats `Failed` exactly
/// like `Absent`, while other flows may want to log the reason first.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    Absent,
    Failed(anyhow::Error),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent | Lookup::Failed(_) => None,
        }
    }
}

impl<T> From<anyhow::Result<Option<T>>> for Lookup<T> {
    fn from(value: anyhow::Result<Option<T>>) -> Self {
        match value {
            Ok(Some(found)) => Lookup::Found(found),
            Ok(None) => Lookup::Absent,
            Err(err) => Lookup::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_and_absent_both_collapse_to_none() {
        let absent: Lookup<u8> = Ok(None).into();
        let failed: Lookup<u8> = Err(anyhow::anyhow!("boom")).into();

        assert!(absent.found().is_none());
        assert!(matches!(failed, Lookup::Failed(_)));
        assert_eq!(Lookup::Found(2).found(), Some(2));
    }
}
