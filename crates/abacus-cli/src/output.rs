use crate::runner::Runner;
use abacus_core::abacus::Cluster;
use anyhow::Context;
use fnv::FnvHashMap;
use rayon::prelude::*;
use std::path::Path;

/// Extra per-protein columns appended to the report, keyed by protein id
#[derive(Default, Debug)]
pub struct Annotation {
    pub headers: Vec<String>,
    rows: FnvHashMap<String, Vec<String>>,
}

impl Annotation {
    pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to read annotation from `{}`", path.display()))?;

        let headers = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(String::from)
            .collect::<Vec<_>>();

        let mut rows = FnvHashMap::default();
        for record in rdr.records() {
            let record = record?;
            let Some(id) = record.get(0) else {
                continue;
            };
            let mut values = record
                .iter()
                .skip(1)
                .map(String::from)
                .collect::<Vec<_>>();
            values.resize(headers.len(), String::new());
            rows.entry(id.to_string()).or_insert(values);
        }

        log::info!(
            "read {} annotations ({} columns) from {}",
            rows.len(),
            headers.len(),
            path.display()
        );
        Ok(Annotation { headers, rows })
    }

    pub fn get(&self, protein_id: &str) -> Option<&[String]> {
        self.rows.get(protein_id).map(Vec::as_slice)
    }
}

impl Runner {
    /// Number of label channels reported for any cluster
    fn channels(clusters: &[Cluster]) -> usize {
        clusters
            .iter()
            .map(|cluster| cluster.intensities.len())
            .max()
            .unwrap_or(0)
    }

    pub fn serialize_cluster(&self, cluster: &Cluster, channels: usize) -> csv::ByteRecord {
        let mut record = csv::ByteRecord::new();
        record.push_field(itoa::Buffer::new().format(cluster.number).as_bytes());
        record.push_field(cluster.centroid.as_bytes());
        record.push_field(itoa::Buffer::new().format(cluster.members.len()).as_bytes());
        record.push_field(
            cluster
                .members
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
                .as_bytes(),
        );
        record.push_field(format!("{:.2}", cluster.coverage).as_bytes());
        record.push_field(itoa::Buffer::new().format(cluster.total_peptides).as_bytes());
        record.push_field(
            itoa::Buffer::new()
                .format(cluster.unique_peptides.len())
                .as_bytes(),
        );
        record.push_field(itoa::Buffer::new().format(cluster.shared_peptides).as_bytes());
        record.push_field(cluster.description.as_bytes());

        if let Some(annotation) = &self.annotation {
            match annotation.get(&cluster.centroid) {
                Some(values) => {
                    for value in values {
                        record.push_field(value.as_bytes());
                    }
                }
                None => {
                    for _ in &annotation.headers {
                        record.push_field(b"");
                    }
                }
            }
        }

        if self.parameters.parameters.labels {
            for channel in 0..channels {
                let value = cluster.intensities.get(channel).copied().unwrap_or(0.0);
                record.push_field(ryu::Buffer::new().format(value).as_bytes());
            }
        }
        record
    }

    pub fn write_report(&self, clusters: &[Cluster]) -> anyhow::Result<String> {
        let path = self.make_path("abacus.tsv");

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        let mut headers = csv::ByteRecord::from(vec![
            "Cluster Number",
            "Representative",
            "Total Members",
            "Members",
            "Percentage Coverage",
            "Total Peptides",
            "Intra Cluster Peptides",
            "Inter Cluster Peptides",
            "Description",
        ]);
        if let Some(annotation) = &self.annotation {
            for header in &annotation.headers {
                headers.push_field(header.as_bytes());
            }
        }
        let channels = Self::channels(clusters);
        if self.parameters.parameters.labels {
            for channel in 1..=channels {
                headers.push_field(format!("channel_{}", channel).as_bytes());
            }
        }

        wtr.write_byte_record(&headers)?;
        for record in clusters
            .par_iter()
            .map(|cluster| self.serialize_cluster(cluster, channels))
            .collect::<Vec<_>>()
        {
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write report to `{}`", path.display()))?;
        Ok(path.display().to_string())
    }
}
