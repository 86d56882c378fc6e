use std::path::PathBuf;

pub fn medmcp_cache_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join("medmcp"),
        None => std::env::temp_dir().join("medmcp"),
    }
}

#[cfg(test)]
mod tests {
    use super::medmcp_cache_dir;

    #[test]
    fn cache_dir_ends_with_app_name() {
        assert!(medmcp_cache_dir().ends_with("medmcp"));
    }
}
