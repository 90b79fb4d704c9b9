//! Per-ion label intensities produced by an external quantification engine
//!
//! The input is tab-delimited with a header line:
//!
//! ```text
//! peptide	charge	126	127N	127C	...
//! LVNELTEFAK	2	1020.5	998.1	1500.0
//! ```
//!
//! Channel values are treated as opaque numbers.

use crate::protein::ProtXml;
use crate::Error;
use fnv::FnvHashMap;
use std::io::Read;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Labels {
    pub channels: Vec<String>,
    intensities: FnvHashMap<(String, u8), Vec<f64>>,
}

impl Labels {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Self::parse(file)
    }

    pub fn parse<R: Read>(reader: R) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);

        let channels = rdr
            .headers()?
            .iter()
            .skip(2)
            .map(String::from)
            .collect::<Vec<_>>();

        let mut intensities = FnvHashMap::default();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let malformed = |reason: String| Error::Labels { line, reason };

            let peptide = record
                .get(0)
                .ok_or_else(|| malformed("missing peptide".into()))?;
            let charge = record
                .get(1)
                .unwrap_or_default()
                .trim()
                .parse::<u8>()
                .map_err(|e| malformed(format!("charge: {}", e)))?;
            let values = record
                .iter()
                .skip(2)
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| malformed(format!("intensity: {}", e)))?;

            intensities.insert((peptide.to_string(), charge), values);
        }

        Ok(Labels {
            channels,
            intensities,
        })
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    /// Copy intensities onto every peptide ion with a matching sequence and
    /// charge. Returns the number of annotated ions.
    pub fn attach(&self, model: &mut ProtXml) -> usize {
        let mut attached = 0;
        let mut key = (String::new(), 0u8);
        for protein in model.proteins_mut() {
            for ion in protein.peptide_ions.iter_mut() {
                key.0.clear();
                key.0.push_str(&ion.peptide_sequence);
                key.1 = ion.charge;
                if let Some(values) = self.intensities.get(&key) {
                    ion.intensities = values.clone();
                    attached += 1;
                }
            }
        }
        log::debug!(
            "{}: {} of {} label rows matched a peptide ion",
            model.name,
            attached,
            self.len()
        );
        attached
    }
}
