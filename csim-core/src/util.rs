use std::error::Error;
use std::fs;
use std::path::PathBuf;
use regex::Regex;
use crate::geometry::Geometry;

pub const TRACES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/traces");
pub const EXPECTED_OUTPUTS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/expected");

/// A bundled trace, the geometry to replay it with, and the statistics that should come out
pub struct TestCasePaths {
    pub trace: PathBuf,
    pub geometry: Geometry,
    pub output: PathBuf,
}

/// Finds every expected output named `<trace>-s<s>-E<E>-b<b>.json` and pairs it with
/// `traces/<trace>.trace`, sorted by file name
pub fn get_test_cases() -> Result<Vec<TestCasePaths>, Box<dyn Error>> {
    let mut out = Vec::new();
    let output_pattern = Regex::new(r"^(?P<trace>[0-9a-zA-Z_]+)-s(?P<s>\d+)-E(?P<e>\d+)-b(?P<b>\d+)\.json$")?;
    let mut file_names = fs::read_dir(EXPECTED_OUTPUTS_PATH)?
        .map(|entry| -> Result<String, Box<dyn Error>> {
            entry?
                .file_name()
                .into_string()
                .map_err(|e| format!("Can't convert OS string ({e:?}) to standard string").into())
        })
        .collect::<Result<Vec<String>, Box<dyn Error>>>()?;
    file_names.retain(|name| output_pattern.is_match(name));
    file_names.sort();
    for file_name in file_names {
        let tokens = output_pattern
            .captures(&file_name)
            .ok_or("Couldn't parse the file name")?;
        let geometry = Geometry::new(tokens["s"].parse()?, tokens["e"].parse()?, tokens["b"].parse()?)?;
        out.push(TestCasePaths {
            trace: PathBuf::from(format!("{TRACES_PATH}/{}.trace", &tokens["trace"])),
            geometry,
            output: PathBuf::from(format!("{EXPECTED_OUTPUTS_PATH}/{file_name}")),
        });
    }
    Ok(out)
}
