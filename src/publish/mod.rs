// src/publish/mod.rs
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
    format::KeyValue,
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Descriptor published next to every dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub source: String,
    pub source_url: String,
    #[serde(serialize_with = "ordered_map")]
    pub column_descriptions: Vec<(String, String)>,
}

// Declaration order is kept in the JSON object.
fn ordered_map<S: Serializer>(pairs: &[(String, String)], s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(pairs.len()))?;
    for (k, v) in pairs {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Overwrite,
}

pub trait Publisher {
    fn publish(&self, batch: &RecordBatch, dataset_id: &str, mode: PublishMode) -> Result<()>;
    fn publish_metadata(&self, dataset_id: &str, metadata: &DatasetMetadata) -> Result<()>;
}

/// Writes `<dir>/<id>.parquet` and `<dir>/<id>.metadata.json`.
pub struct LocalPublisher {
    dir: PathBuf,
    run_id: String,
}

impl LocalPublisher {
    pub fn new(dir: impl Into<PathBuf>, run_id: &str) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("creating output dir {:?}", &dir))?;
        Ok(Self {
            dir,
            run_id: run_id.to_string(),
        })
    }

    pub fn table_path(&self, dataset_id: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", dataset_id))
    }

    pub fn metadata_path(&self, dataset_id: &str) -> PathBuf {
        self.dir.join(format!("{}.metadata.json", dataset_id))
    }

    fn tmp_path(final_path: &Path) -> PathBuf {
        let mut name = final_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        final_path.with_file_name(name)
    }
}

impl Publisher for LocalPublisher {
    #[instrument(level = "info", skip(self, batch), fields(rows = batch.num_rows()))]
    fn publish(&self, batch: &RecordBatch, dataset_id: &str, mode: PublishMode) -> Result<()> {
        match mode {
            PublishMode::Overwrite => {}
        }
        let final_path = self.table_path(dataset_id);
        let tmp = Self::tmp_path(&final_path);

        let file = File::create(&tmp).with_context(|| format!("creating {:?}", &tmp))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_key_value_metadata(Some(vec![
                KeyValue::new("run_id".to_string(), self.run_id.clone()),
                KeyValue::new("published_at".to_string(), Utc::now().to_rfc3339()),
            ]))
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
            .with_context(|| format!("creating Arrow writer for {}", dataset_id))?;
        writer
            .write(batch)
            .with_context(|| format!("writing {}", dataset_id))?;
        writer
            .close()
            .with_context(|| format!("closing writer for {}", dataset_id))?;
        fs::rename(&tmp, &final_path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp, final_path))?;

        info!(path = %final_path.display(), "published {}", dataset_id);
        Ok(())
    }

    fn publish_metadata(&self, dataset_id: &str, metadata: &DatasetMetadata) -> Result<()> {
        let final_path = self.metadata_path(dataset_id);
        let tmp = Self::tmp_path(&final_path);
        let mut file = File::create(&tmp).with_context(|| format!("creating {:?}", &tmp))?;
        serde_json::to_writer_pretty(&mut file, metadata)
            .with_context(|| format!("serialising metadata for {}", dataset_id))?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp, &final_path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp, final_path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::{
        array::{Int64Array, StringArray},
        datatypes::{DataType, Field, Schema},
    };
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn batch(rows: i64) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("fips", DataType::Utf8, true),
            Field::new("fmr_0", DataType::Int64, true),
        ]));
        let fips: Vec<String> = (0..rows).map(|i| format!("{:0>9}", i)).collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(fips)),
                Arc::new(Int64Array::from((0..rows).map(|i| 900 + i).collect::<Vec<_>>())),
            ],
        )
        .unwrap()
    }

    #[test]
    fn overwrite_replaces_previous_table() -> Result<()> {
        let tmp = tempdir()?;
        let publisher = LocalPublisher::new(tmp.path(), "test-run")?;
        publisher.publish(&batch(5), "hud_fair_market_rents", PublishMode::Overwrite)?;
        publisher.publish(&batch(3), "hud_fair_market_rents", PublishMode::Overwrite)?;

        let file = File::open(publisher.table_path("hud_fair_market_rents"))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let kv = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .cloned()
            .unwrap_or_default();
        assert!(kv.iter().any(|k| k.key == "run_id" && k.value.as_deref() == Some("test-run")));
        let rows: usize = builder.build()?.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);

        let leftovers: Vec<_> = fs::read_dir(tmp.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn metadata_keeps_column_order() -> Result<()> {
        let tmp = tempdir()?;
        let publisher = LocalPublisher::new(tmp.path(), "test-run")?;
        let meta = DatasetMetadata {
            id: "hud_x".into(),
            title: "X".into(),
            description: "d".into(),
            source: "HUD".into(),
            source_url: "https://www.huduser.gov".into(),
            column_descriptions: vec![
                ("zeta".into(), "last alphabetically".into()),
                ("alpha".into(), "first alphabetically".into()),
            ],
        };
        publisher.publish_metadata("hud_x", &meta)?;
        let text = fs::read_to_string(publisher.metadata_path("hud_x"))?;
        let zeta = text.find("\"zeta\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value["id"], "hud_x");
        Ok(())
    }
}
