use super::Database;
use tempfile::NamedTempFile;


/// Helper to create a database backed by a temp file.
///
/// The `NamedTempFile` must be kept alive for the duration of the test so the
/// file (and its WAL sidecars) are not removed underneath the pool.
async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}
