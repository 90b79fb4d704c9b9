//! Streaming reader for ProteinProphet `protXML` files

use crate::protein::{PeptideIonIdentification, ProtXml, ProteinGroup, ProteinIdentification};
use crate::xml::{flag, number, required, text, XmlError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Which tag are we inside?
enum State {
    Group,
    Protein,
    IndistinguishableProtein,
    Peptide,
}

#[derive(Default)]
pub struct ProtXmlReader {
    state: Option<State>,
    /// Set once `</protein_summary>` is seen
    closed: bool,
    run_options: String,
    groups: Vec<ProteinGroup>,
    group: ProteinGroup,
    protein: ProteinIdentification,
    ion: PeptideIonIdentification,
}

impl ProtXmlReader {
    /// Read a protXML file from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<ProtXml, XmlError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut model = ProtXmlReader::default().parse(BufReader::new(file))?;
        model.name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(model)
    }

    /// Parse a protXML document. Fails with [`XmlError::NoRecordsFound`] if the
    /// document contains no protein groups.
    pub fn parse<B: BufRead>(mut self, b: B) -> Result<ProtXml, XmlError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref ev)) => self.open(ev)?,
                Ok(Event::Empty(ref ev)) => {
                    self.open(ev)?;
                    self.close(ev.local_name().into_inner())?;
                }
                Ok(Event::End(ref ev)) => self.close(ev.local_name().into_inner())?,
                Ok(Event::Eof) => break,
                Err(err) => return Err(err.into()),
                _ => {}
            }
            buf.clear();
        }

        if self.state.is_some() || !self.closed {
            return Err(XmlError::Malformed("unexpected end of document".into()));
        }
        if self.groups.is_empty() {
            return Err(XmlError::NoRecordsFound("protein groups"));
        }

        Ok(ProtXml {
            name: String::default(),
            run_options: self.run_options,
            groups: self.groups,
        })
    }

    fn open(&mut self, ev: &BytesStart) -> Result<(), XmlError> {
        match (ev.local_name().into_inner(), self.state) {
            (b"proteinprophet_details", None) => {
                self.run_options = text(ev, "run_options")?.unwrap_or_default();
            }
            (b"protein_group", None) => {
                self.group = ProteinGroup {
                    group_number: number(ev, "group_number")?.unwrap_or_default(),
                    probability: number(ev, "probability")?.unwrap_or_default(),
                    proteins: Vec::new(),
                };
                self.state = Some(State::Group);
            }
            (b"protein", Some(State::Group)) => {
                self.protein = ProteinIdentification {
                    group_number: self.group.group_number,
                    group_sibling_id: text(ev, "group_sibling_id")?.unwrap_or_default(),
                    protein_name: required(ev, "protein_name")?,
                    percent_coverage: number(ev, "percent_coverage")?.unwrap_or_default(),
                    percent_spectrum_ids: number(ev, "pct_spectrum_ids")?.unwrap_or_default(),
                    group_probability: self.group.probability,
                    probability: number(ev, "probability")?.unwrap_or_default(),
                    confidence: number(ev, "confidence")?.unwrap_or_default(),
                    total_number_peptides: number(ev, "total_number_peptides")?
                        .unwrap_or_default(),
                    unique_stripped_peptides: text(ev, "unique_stripped_peptides")?
                        .map(|peptides| {
                            peptides
                                .split('+')
                                .filter(|s| !s.is_empty())
                                .map(String::from)
                                .collect()
                        })
                        .unwrap_or_default(),
                    ..Default::default()
                };
                self.state = Some(State::Protein);
            }
            (b"parameter", Some(State::Protein)) => {
                if text(ev, "name")?.as_deref() == Some("prot_length") {
                    self.protein.length = number(ev, "value")?.unwrap_or_default();
                }
            }
            (b"annotation", Some(State::Protein)) => {
                if let Some(description) = text(ev, "protein_description")? {
                    self.protein.description = description;
                }
            }
            (b"indistinguishable_protein", Some(State::Protein)) => {
                let name = required(ev, "protein_name")?;
                self.protein.indistinguishable_proteins.push(name);
                self.state = Some(State::IndistinguishableProtein);
            }
            (b"peptide", Some(State::Protein)) => {
                self.ion = PeptideIonIdentification {
                    peptide_sequence: required(ev, "peptide_sequence")?,
                    charge: number(ev, "charge")?.unwrap_or_default(),
                    initial_probability: number(ev, "initial_probability")?.unwrap_or_default(),
                    weight: number(ev, "weight")?.unwrap_or_default(),
                    group_weight: number(ev, "group_weight")?.unwrap_or_default(),
                    calc_neutral_pep_mass: number(ev, "calc_neutral_pep_mass")?
                        .unwrap_or_default(),
                    number_of_enzymatic_termini: number(ev, "n_enzymatic_termini")?
                        .unwrap_or_default(),
                    number_of_instances: number(ev, "n_instances")?.unwrap_or_default(),
                    is_nondegenerate_evidence: flag(ev, "is_nondegenerate_evidence")?,
                    ..Default::default()
                };
                self.state = Some(State::Peptide);
            }
            (b"peptide_parent_protein", Some(State::Peptide)) => {
                let name = required(ev, "protein_name")?;
                self.ion.parent_proteins.push(name);
            }
            (b"modification_info", Some(State::Peptide)) => {
                if let Some(modified) = text(ev, "modified_peptide")? {
                    self.ion.modified_peptide = modified;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), XmlError> {
        self.state = match (name, self.state) {
            (b"indistinguishable_protein", Some(State::IndistinguishableProtein)) => {
                Some(State::Protein)
            }
            (b"peptide", Some(State::Peptide)) => {
                let mut ion = std::mem::take(&mut self.ion);
                if ion.modified_peptide.is_empty() {
                    ion.modified_peptide = ion.peptide_sequence.clone();
                }
                self.protein.peptide_ions.push(ion);
                Some(State::Protein)
            }
            (b"protein", Some(State::Protein)) => {
                let mut protein = std::mem::take(&mut self.protein);
                protein.update_top_pep_prob();
                self.group.proteins.push(protein);
                Some(State::Group)
            }
            (b"protein_group", Some(State::Group)) => {
                let mut group = std::mem::take(&mut self.group);
                // ProteinProphet reports 0 for the lead protein of some
                // single-protein groups that were assigned probability 1
                if group.probability == 1.0 {
                    if let Some(first) = group.proteins.first_mut() {
                        if first.probability == 0.0 {
                            first.probability = group.probability;
                        }
                    }
                }
                self.groups.push(group);
                None
            }
            (b"protein_summary", None) => {
                self.closed = true;
                None
            }
            (b"protein_summary", Some(state)) => {
                return Err(XmlError::Malformed(format!(
                    "document closed inside {:?}",
                    state
                )));
            }
            _ => self.state,
        };
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<protein_summary xmlns="http://regis-web.systemsbiology.net/protXML">
  <protein_summary_header reference_database="db.fas" min_peptide_probability="0.05">
    <program_details analysis="proteinprophet" time="2024-01-01T00:00:00">
      <proteinprophet_details occam_flag="Y" run_options="MINPROB0.05 IPROPHET"/>
    </program_details>
  </protein_summary_header>
  <protein_group group_number="1" probability="1.0000">
    <protein protein_name="sp|P02769|ALBU_BOVIN" n_indistinguishable_proteins="2" probability="0.0000" percent_coverage="12.5" unique_stripped_peptides="LVNELTEFAK+YLYEIAR" group_sibling_id="a" total_number_peptides="3" pct_spectrum_ids="1.25" confidence="0.9">
      <parameter name="prot_length" value="607"/>
      <annotation protein_description="Albumin &amp; friends"/>
      <indistinguishable_protein protein_name="tr|A0A140T897|A0A140T897_BOVIN">
        <annotation protein_description="Albumin"/>
      </indistinguishable_protein>
      <peptide peptide_sequence="LVNELTEFAK" charge="2" initial_probability="0.9990" weight="1.00" group_weight="1.00" is_nondegenerate_evidence="Y" n_enzymatic_termini="2" n_instances="3" calc_neutral_pep_mass="1162.6234">
        <peptide_parent_protein protein_name="tr|A0A140T897|A0A140T897_BOVIN"/>
      </peptide>
      <peptide peptide_sequence="YLYEIAR" charge="2" initial_probability="0.9500" weight="0.50" group_weight="0.50" is_nondegenerate_evidence="N" n_enzymatic_termini="2" n_instances="1" calc_neutral_pep_mass="926.4861">
        <modification_info modified_peptide="Y[243]LYEIAR"/>
      </peptide>
    </protein>
    <protein protein_name="sp|Q00000|OTHER_BOVIN" probability="0.2" total_number_peptides="1">
      <peptide peptide_sequence="AAAK" charge="1" initial_probability="0.3" weight="1.00"/>
    </protein>
  </protein_group>
</protein_summary>
"#;

    #[test]
    fn parse_document() -> Result<(), XmlError> {
        let model = ProtXmlReader::default().parse(DOCUMENT.as_bytes())?;
        assert_eq!(model.run_options, "MINPROB0.05 IPROPHET");
        assert_eq!(model.groups.len(), 1);

        let group = &model.groups[0];
        assert_eq!(group.group_number, 1);
        assert_eq!(group.proteins.len(), 2);

        let lead = &group.proteins[0];
        assert_eq!(lead.protein_name, "sp|P02769|ALBU_BOVIN");
        assert_eq!(lead.probability, 1.0, "zero-probability lead takes the group probability");
        assert_eq!(lead.length, 607);
        assert_eq!(lead.description, "Albumin & friends");
        assert_eq!(lead.unique_stripped_peptides, vec!["LVNELTEFAK", "YLYEIAR"]);
        assert_eq!(
            lead.indistinguishable_proteins,
            vec!["tr|A0A140T897|A0A140T897_BOVIN"]
        );
        assert_eq!(lead.top_pep_prob, 0.999);
        assert_eq!(lead.peptide_ions.len(), 2);
        assert!(lead.peptide_ions[0].is_nondegenerate_evidence);
        assert_eq!(lead.peptide_ions[0].number_of_parent_proteins(), 2);
        assert_eq!(lead.peptide_ions[0].modified_peptide, "LVNELTEFAK");
        assert_eq!(lead.peptide_ions[1].modified_peptide, "Y[243]LYEIAR");
        assert!(!lead.peptide_ions[1].is_unique);

        // Only the first protein of the group is corrected
        let second = &group.proteins[1];
        assert_eq!(second.probability, 0.2);
        assert_eq!(second.group_probability, 1.0);
        assert_eq!(second.top_pep_prob, 0.3);
        Ok(())
    }

    #[test]
    fn correction_requires_certain_group() -> Result<(), XmlError> {
        let doc = r#"<protein_summary><protein_group group_number="7" probability="0.98">
            <protein protein_name="A" probability="0"><peptide peptide_sequence="K" initial_probability="0.5"/></protein>
            </protein_group></protein_summary>"#;
        let model = ProtXmlReader::default().parse(doc.as_bytes())?;
        assert_eq!(model.groups[0].proteins[0].probability, 0.0);
        Ok(())
    }

    #[test]
    fn empty_document() {
        let doc = r#"<protein_summary><protein_summary_header/></protein_summary>"#;
        assert!(matches!(
            ProtXmlReader::default().parse(doc.as_bytes()),
            Err(XmlError::NoRecordsFound(_))
        ));
    }

    #[test]
    fn truncated_document() {
        let doc = r#"<protein_summary><protein_group group_number="1" probability="1"><protein protein_name="A">"#;
        assert!(ProtXmlReader::default().parse(doc.as_bytes()).is_err());
    }

    #[test]
    fn document_cut_between_groups() {
        let group = r#"<protein_group group_number="1" probability="1"><protein protein_name="A" probability="1"><peptide peptide_sequence="K" initial_probability="0.9"/></protein></protein_group>"#;

        let clean_cut = format!("<protein_summary>{}", group);
        let partial_tag = format!("<protein_summary>{}<protein_gr", group);
        for doc in [clean_cut, partial_tag] {
            assert!(
                ProtXmlReader::default().parse(doc.as_bytes()).is_err(),
                "{}",
                doc
            );
        }

        let complete = format!("<protein_summary>{}</protein_summary>", group);
        assert!(ProtXmlReader::default().parse(complete.as_bytes()).is_ok());
    }

    #[test]
    fn missing_protein_name() {
        let doc = r#"<protein_summary><protein_group group_number="1" probability="1"><protein probability="1"/></protein_group></protein_summary>"#;
        assert!(matches!(
            ProtXmlReader::default().parse(doc.as_bytes()),
            Err(XmlError::MissingAttribute {
                attribute: "protein_name",
                ..
            })
        ));
    }
}
