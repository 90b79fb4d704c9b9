use abacus_cli::input::Input;
use abacus_cli::runner::Runner;

fn configure(dir: &std::path::Path, extra: &str) -> anyhow::Result<Input> {
    let output = dir.join("out");
    let json = format!(
        r#"{{
            "parameters": {{ "labels": true }},
            "datasets": [
                {{ "directory": "../../tests/run_a" }},
                {{ "name": "second", "protxml": "../../tests/run_b/interact.prot.xml",
                   "labels": "../../tests/run_b/labels.tsv" }}
            ],
            {}
            "output_directory": {:?}
        }}"#,
        extra,
        output.display().to_string()
    );
    let path = dir.join("config.json");
    std::fs::write(&path, json)?;
    Input::load(path.display().to_string())
}

fn report(path: &std::path::Path) -> anyhow::Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok(rows)
}

#[test]
fn end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = configure(
        dir.path(),
        r#""clusters": "../../tests/clusters.clstr",
           "fasta": "../../tests/proteins.fasta",
           "annotation": "../../tests/annotation.tsv","#,
    )?;

    let settings = input.build()?;
    assert_eq!(settings.datasets[0].name, "run_a");
    assert!(settings.datasets[0].pepxml.is_some());
    assert_eq!(settings.datasets[1].name, "second");
    assert!(settings.datasets[1].pepxml.is_none());

    let settings = Runner::new(settings)?.run()?;
    assert_eq!(settings.output_paths.len(), 2);
    assert!(dir.path().join("out/run_a/protxml.bin").exists());
    assert!(dir.path().join("out/run_a/psm.bin").exists());
    assert!(dir.path().join("out/second/protxml.bin").exists());
    assert!(dir.path().join("out/results.json").exists());

    let rows = report(&dir.path().join("out/abacus.tsv"))?;
    assert_eq!(
        rows[0],
        vec![
            "Cluster Number",
            "Representative",
            "Total Members",
            "Members",
            "Percentage Coverage",
            "Total Peptides",
            "Intra Cluster Peptides",
            "Inter Cluster Peptides",
            "Description",
            "Gene Names",
            "Organism",
            "channel_1",
            "channel_2",
        ]
    );
    assert_eq!(rows.len(), 4);

    let centroids = rows[1..].iter().map(|r| r[1].as_str()).collect::<Vec<_>>();
    assert_eq!(centroids, vec!["P01012", "P02769", "P00761"]);

    let albumin = &rows[2];
    assert_eq!(albumin[0], "0");
    assert_eq!(albumin[2], "3");
    assert_eq!(albumin[3], "P02769, P02768, A0A140T897");
    assert_eq!(albumin[4], "30.00");
    assert_eq!(&albumin[5..8], &["7", "3", "4"]);
    assert_eq!(albumin[8], "Albumin");
    assert_eq!(&albumin[9..11], &["ALB", "Bos taurus"]);
    assert_eq!(&albumin[11..], &["4016.0", "6028.0"]);

    // Trypsin has no annotation and no labels
    let trypsin = &rows[3];
    assert_eq!(&trypsin[9..], &["", "", "0.0", "0.0"]);
    Ok(())
}

#[test]
fn one_dataset_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        format!(
            r#"{{ "datasets": [ {{ "directory": "../../tests/run_a" }} ], "output_directory": {:?} }}"#,
            dir.path().join("out").display().to_string()
        ),
    )?;
    let input = Input::load(path.display().to_string())?;
    let settings = input.build()?;
    assert_eq!(settings.datasets.len(), 1);
    assert!(Runner::new(settings)?.run().is_err());
    Ok(())
}
