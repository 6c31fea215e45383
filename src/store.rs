use anyhow::Context as AnyhowContext;
use recon_types::DayKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

fn read_value(path: &Path) -> Result<Option<Value>, anyhow::Error> {
    let input = match std::fs::read_to_string(path) {
        Ok(input) => input,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::info!("{} not found, starting empty", path.display());
            return Ok(None);
        }
        Err(err) => return Err(err).context(format!("Unable to read {}", path.display())),
    };
    let value = serde_json::from_str(&input)
        .with_context(|| format!("Unable to parse {}", path.display()))?;
    Ok(Some(value))
}

pub fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, anyhow::Error> {
    match read_value(path)? {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("Unexpected content in {}", path.display())),
        None => Ok(T::default()),
    }
}

/// Reads a date-keyed map, dropping entries whose key or body cannot be
/// parsed instead of failing the whole file.
pub fn read_keyed<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<DayKey, T>, anyhow::Error> {
    let entries: BTreeMap<String, Value> = match read_value(path)? {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("{} is not a date-keyed object", path.display()))?,
        None => return Ok(BTreeMap::new()),
    };
    let mut res = BTreeMap::new();
    for (key, value) in entries {
        let day = match key.parse::<DayKey>() {
            Ok(day) => day,
            Err(err) => {
                log::warn!("{}: {err}", path.display());
                continue;
            }
        };
        match serde_json::from_value(value) {
            Ok(record) => {
                res.insert(day, record);
            }
            Err(err) => log::warn!("{}: skipping {key}: {err}", path.display()),
        }
    }
    Ok(res)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), anyhow::Error> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).context("Unable to create dir")?;
    }
    let output = serde_json::to_string_pretty(value)?;
    std::fs::write(path, output).with_context(|| format!("Unable to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_types::DailyRecord;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("sales-recon-store-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn missing_file_is_empty() {
        let path = temp_path("missing.json");
        let days: BTreeMap<DayKey, DailyRecord> = read_keyed(&path).unwrap();
        assert!(days.is_empty());
        let values: Vec<u32> = read_json(&path).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn bad_entries_are_skipped() {
        let path = temp_path("days.json");
        write_json(
            &path,
            &serde_json::json!({
                "2024-06-03": {"amazon": {"revenue": "12.5"}},
                "not-a-date": {"amazon": {"revenue": 1}},
                "2024-06-04": [1, 2, 3]
            }),
        )
        .unwrap();
        let days: BTreeMap<DayKey, DailyRecord> = read_keyed(&path).unwrap();
        assert_eq!(days.len(), 1);
        let day = &days[&"2024-06-03".parse().unwrap()];
        assert_eq!(day.amazon.revenue, 12.5);
    }

    #[test]
    fn key_with_trailing_junk_does_not_replace_real_day() {
        let path = temp_path("colliding.json");
        write_json(
            &path,
            &serde_json::json!({
                "2024-06-03": {"amazon": {"revenue": 100}},
                "2024-06-03x": {"amazon": {"revenue": 1}}
            }),
        )
        .unwrap();
        let days: BTreeMap<DayKey, DailyRecord> = read_keyed(&path).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[&"2024-06-03".parse().unwrap()].amazon.revenue, 100.0);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let path = temp_path("broken.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(read_json::<Vec<u32>>(&path).is_err());
    }
}
