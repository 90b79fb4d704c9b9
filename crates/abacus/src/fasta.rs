use crate::protein::accession;
use fnv::FnvHashMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    /// Entry name, e.g. `ALBU_BOVIN`
    pub entry_name: String,
    pub description: String,
    pub decoy: bool,
    pub contaminant: bool,
}

/// Protein headers of a FASTA database, keyed by accession
pub struct Fasta {
    pub records: Vec<FastaRecord>,
    index: FnvHashMap<String, usize>,
}

impl Fasta {
    // Parse a string into a fasta database. Sequences are not kept.
    pub fn parse<S: AsRef<str>>(contents: &str, decoy_tag: S, contaminant_tag: S) -> Fasta {
        let decoy_tag = decoy_tag.as_ref();
        let contaminant_tag = contaminant_tag.as_ref();

        let mut records: Vec<FastaRecord> = Vec::new();
        let mut index: FnvHashMap<String, usize> = FnvHashMap::default();

        for line in contents.lines() {
            let line = line.trim();
            let header = match line.strip_prefix('>') {
                Some(header) => header,
                None => continue,
            };

            let (name, description) = match header.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim()),
                None => (header, ""),
            };
            let entry_name = name.rsplit('|').next().unwrap_or(name);
            // Trailing `OS=... OX=...` fields are not part of the description
            let description = match description.find(" OS=") {
                Some(pos) => &description[..pos],
                None => description,
            };

            let record = FastaRecord {
                id: accession(name).to_string(),
                entry_name: entry_name.to_string(),
                description: description.to_string(),
                decoy: !decoy_tag.is_empty() && name.contains(decoy_tag),
                contaminant: !contaminant_tag.is_empty() && name.contains(contaminant_tag),
            };

            // Targets shadow decoys sharing their accession
            let replace = match index.get(&record.id) {
                Some(&idx) => records[idx].decoy && !record.decoy,
                None => true,
            };
            if replace {
                index.insert(record.id.clone(), records.len());
            }
            records.push(record);
        }

        Fasta { records, index }
    }

    pub fn get(&self, id: &str) -> Option<&FastaRecord> {
        self.index.get(id).map(|&idx| &self.records[idx])
    }
}
