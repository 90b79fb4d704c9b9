//! Streaming reader for PeptideProphet/iProphet `pepXML` files

use crate::psm::{Modification, PeptideSpectrumMatch};
use crate::xml::{number, required, text, XmlError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Declared masses are matched to observed modification masses within this tolerance
const MASS_TOLERANCE: f64 = 1e-3;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// A modification declared in the search summary
pub struct DeclaredModification {
    /// Residue, or `n`/`c` for terminal modifications
    pub site: String,
    pub mass: f64,
    pub mass_diff: f64,
    pub variable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PepXml {
    /// File name the model was read from
    pub name: String,
    pub base_name: String,
    pub raw_data: String,
    pub database: String,
    /// Analyses that processed this file (`peptideprophet`, `interprophet`, ...)
    pub analyses: Vec<String>,
    pub modifications: Vec<DeclaredModification>,
    pub psms: Vec<PeptideSpectrumMatch>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Which tag are we inside?
enum State {
    Query,
    Hit,
    /// Lower-ranked hits are skipped entirely
    SkipHit,
}

#[derive(Default)]
pub struct PepXmlReader {
    state: Option<State>,
    /// Set once `</msms_pipeline_analysis>` is seen
    closed: bool,
    model: PepXml,
    psm: PeptideSpectrumMatch,
    has_hit: bool,
    peptide_prophet: f64,
    inter_prophet: f64,
}

impl PepXmlReader {
    /// Read a pepXML file from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<PepXml, XmlError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut model = PepXmlReader::default().parse(BufReader::new(file))?;
        model.name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(model)
    }

    /// Parse a pepXML document.
    ///
    /// A document without any `analysis_summary` has not been validated and
    /// yields an empty model. A validated document without spectrum queries
    /// fails with [`XmlError::NoRecordsFound`].
    pub fn parse<B: BufRead>(mut self, b: B) -> Result<PepXml, XmlError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref ev)) => self.open(ev)?,
                Ok(Event::Empty(ref ev)) => {
                    self.open(ev)?;
                    self.close(ev.local_name().into_inner());
                }
                Ok(Event::End(ref ev)) => self.close(ev.local_name().into_inner()),
                Ok(Event::Eof) => break,
                Err(err) => return Err(err.into()),
                _ => {}
            }
            buf.clear();
        }

        if self.state.is_some() || !self.closed {
            return Err(XmlError::Malformed("unexpected end of document".into()));
        }
        if self.model.analyses.is_empty() {
            log::warn!("pepXML document has no analysis summary, skipping");
            return Ok(PepXml {
                psms: Vec::new(),
                ..self.model
            });
        }
        if self.model.psms.is_empty() {
            return Err(XmlError::NoRecordsFound("peptide spectrum matches"));
        }
        Ok(self.model)
    }

    fn open(&mut self, ev: &BytesStart) -> Result<(), XmlError> {
        match (ev.local_name().into_inner(), self.state) {
            (b"analysis_summary", None) => {
                let analysis = text(ev, "analysis")?.unwrap_or_default();
                self.model.analyses.push(analysis);
            }
            (b"msms_run_summary", None) => {
                self.model.base_name = text(ev, "base_name")?.unwrap_or_default();
                self.model.raw_data = text(ev, "raw_data")?.unwrap_or_default();
            }
            (b"search_database", None) => {
                self.model.database = text(ev, "local_path")?.unwrap_or_default();
            }
            (b"aminoacid_modification", None) => {
                self.model.modifications.push(DeclaredModification {
                    site: required(ev, "aminoacid")?,
                    mass: number(ev, "mass")?.unwrap_or_default(),
                    mass_diff: number(ev, "massdiff")?.unwrap_or_default(),
                    variable: text(ev, "variable")?.as_deref() == Some("Y"),
                });
            }
            (b"terminal_modification", None) => {
                self.model.modifications.push(DeclaredModification {
                    site: required(ev, "terminus")?.to_lowercase(),
                    mass: number(ev, "mass")?.unwrap_or_default(),
                    mass_diff: number(ev, "massdiff")?.unwrap_or_default(),
                    variable: text(ev, "variable")?.as_deref() == Some("Y"),
                });
            }
            (b"spectrum_query", None) => {
                self.psm = PeptideSpectrumMatch {
                    index: number(ev, "index")?.unwrap_or_default(),
                    spectrum: required(ev, "spectrum")?,
                    scan: number(ev, "start_scan")?.unwrap_or_default(),
                    precursor_neutral_mass: number(ev, "precursor_neutral_mass")?
                        .unwrap_or_default(),
                    assumed_charge: number(ev, "assumed_charge")?.unwrap_or_default(),
                    retention_time: number(ev, "retention_time_sec")?.unwrap_or_default(),
                    ..Default::default()
                };
                self.has_hit = false;
                self.peptide_prophet = 0.0;
                self.inter_prophet = 0.0;
                self.state = Some(State::Query);
            }
            (b"search_hit", Some(State::Query)) => {
                let rank = number(ev, "hit_rank")?.unwrap_or(1);
                if self.has_hit || rank > 1 {
                    self.state = Some(State::SkipHit);
                    return Ok(());
                }
                let massdiff = number(ev, "massdiff")?.unwrap_or_default();
                self.psm.hit_rank = rank;
                self.psm.peptide = required(ev, "peptide")?;
                self.psm.protein = required(ev, "protein")?;
                self.psm.calc_neutral_pep_mass =
                    number(ev, "calc_neutral_pep_mass")?.unwrap_or_default();
                self.psm.massdiff = massdiff;
                self.psm.raw_massdiff = massdiff;
                self.has_hit = true;
                self.state = Some(State::Hit);
            }
            (b"alternative_protein", Some(State::Hit)) => {
                let protein = required(ev, "protein")?;
                self.psm.alternative_proteins.push(protein);
            }
            (b"modification_info", Some(State::Hit)) => {
                self.psm.modified_peptide = text(ev, "modified_peptide")?.unwrap_or_default();
                self.psm.nterm_mass = number(ev, "mod_nterm_mass")?.unwrap_or_default();
            }
            (b"mod_aminoacid_mass", Some(State::Hit)) => {
                let position = number(ev, "position")?.unwrap_or_default();
                let mass = number(ev, "mass")?.unwrap_or_default();
                let mass_diff = self.declared_mass_diff(position, mass);
                self.psm.modifications.push(Modification {
                    position,
                    mass,
                    mass_diff,
                });
            }
            (b"search_score", Some(State::Hit)) => {
                let name = text(ev, "name")?.unwrap_or_default();
                let value = || -> Result<f64, XmlError> {
                    Ok(number(ev, "value")?.unwrap_or_default())
                };
                match name.as_str() {
                    "expect" => self.psm.expectation = value()?,
                    "xcorr" => self.psm.xcorr = value()?,
                    "deltacn" => self.psm.delta_cn = value()?,
                    "sprank" => self.psm.sp_rank = value()?,
                    _ => {}
                }
            }
            (b"peptideprophet_result", Some(State::Hit)) => {
                self.peptide_prophet = number(ev, "probability")?.unwrap_or_default();
            }
            (b"interprophet_result", Some(State::Hit)) => {
                self.inter_prophet = number(ev, "probability")?.unwrap_or_default();
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        self.state = match (name, self.state) {
            (b"search_hit", Some(State::Hit | State::SkipHit)) => Some(State::Query),
            (b"msms_pipeline_analysis", None) => {
                self.closed = true;
                None
            }
            (b"spectrum_query", Some(State::Query)) => {
                let mut psm = std::mem::take(&mut self.psm);
                if self.has_hit {
                    psm.probability = if self.inter_prophet > 0.0 {
                        self.inter_prophet
                    } else {
                        self.peptide_prophet
                    };
                    self.model.psms.push(psm);
                }
                None
            }
            _ => self.state,
        };
    }

    fn declared_mass_diff(&self, position: u16, mass: f64) -> f64 {
        let residue = self
            .psm
            .peptide
            .chars()
            .nth((position as usize).saturating_sub(1))
            .map(String::from)
            .unwrap_or_default();
        self.model
            .modifications
            .iter()
            .find(|m| m.site == residue && (m.mass - mass).abs() < MASS_TOLERANCE)
            .map(|m| m.mass_diff)
            .unwrap_or_default()
    }
}
