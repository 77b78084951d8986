//! Demarcation of solver output into labelled bands
//!
//! The script prints a sentinel before and after every quantity of
//! interest. Lines between a pair of sentinels form a band; prompt echo
//! inside a band (any line with a `:`) is dropped, except the `Time:` line
//! printed by `showtime`, which gives the band runtime.

use crate::result::Counterexample;
use redcomp_contracts::protocol::{BEGIN_PRINTING, END_PRINTING};
use redcomp_contracts::{split_markers, Band, Renaming};
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use tracing::{debug, warn};

const TIME_PREFIX: &str = "Time:";

/// Raw text and runtime of one band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandText {
    pub raw: String,

    /// Seconds, from the `Time:` line
    pub runtime: Option<f64>,
}

impl BandText {
    /// Text with solver escapes and line breaks normalised
    pub fn text(&self) -> String {
        clean(&self.raw)
    }
}

/// Everything the solver printed, split into bands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverOutput {
    pub bands: BTreeMap<Band, BandText>,

    /// Every line read, for error reports
    pub transcript: String,
}

impl SolverOutput {
    pub fn band(&self, band: &Band) -> Option<&BandText> {
        self.bands.get(band)
    }
}

/// Read solver output until end of stream, `End-of-file` or `Quitting`
pub fn read_output(reader: impl BufRead) -> io::Result<SolverOutput> {
    read_output_with(reader, |_, _| Ok(()))
}

/// Like [`read_output`], calling `on_band` as soon as each band is complete
pub fn read_output_with(
    mut reader: impl BufRead,
    mut on_band: impl FnMut(&Band, &SolverOutput) -> io::Result<()>,
) -> io::Result<SolverOutput> {
    let mut output = SolverOutput::default();
    let mut current: Option<(Band, BandText)> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        output.transcript.push_str(&line);
        let trimmed = line.trim();
        if trimmed.contains("End-of-file") || trimmed.contains("Quitting") {
            break;
        }

        if let Some((band, mut text)) = current.take() {
            if trimmed.starts_with(END_PRINTING) {
                debug!(%band, "band complete");
                output.bands.insert(band.clone(), text);
                on_band(&band, &output)?;
            } else {
                if let Some(time) = trimmed.strip_prefix(TIME_PREFIX) {
                    text.runtime = parse_runtime(time);
                } else if !trimmed.contains(':') {
                    text.raw.push_str(&line);
                }
                current = Some((band, text));
            }
        } else if let Some(label) = trimmed.strip_prefix(BEGIN_PRINTING) {
            match Band::from_label(label) {
                Some(band) => current = Some((band, BandText::default())),
                None => warn!(label, "ignoring band with unknown label"),
            }
        }
    }

    if let Some((band, _)) = current {
        warn!(%band, "output ended inside a band");
    }
    // Drain whatever follows so the solver never blocks on a full pipe
    let mut rest = String::new();
    while reader.read_line(&mut rest)? > 0 {
        output.transcript.push_str(&rest);
        rest.clear();
    }
    Ok(output)
}

/// Milliseconds reported by `showtime`, as seconds
fn parse_runtime(text: &str) -> Option<f64> {
    let millis: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(millis / 1000.0)
}

/// Drop `!` escapes and line breaks, turn `$` terminators into line breaks
/// and break after every comma
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '!' | '\r' | '\n'))
        .collect::<String>()
        .replace('$', "\n")
        .replace(',', ",\n")
}

/// Strongest property with each disjunct on a line of its own
pub fn display_strongest(text: &str) -> String {
    text.replace(" or ", "\n or \n")
}

/// Counterexample from the `name = value` lines of a cleaned band.
///
/// Temporal markers give the time step of each value, normalised so the
/// earliest step is 0. Names are reported through `renaming`.
pub fn extract_counterexample(text: &str, renaming: &Renaming) -> Counterexample {
    let mut entries = Vec::new();
    for line in text.lines().filter(|l| l.contains('=')) {
        let line: String = line.chars().filter(|c| !matches!(c, ',' | '{' | '}')).collect();
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let (offset, root) = split_markers(name.trim());
        entries.push((offset, renaming.rename(root), value.trim().to_string()));
    }

    let earliest = entries.iter().map(|(offset, _, _)| *offset).min().unwrap_or(0);
    let mut cex = Counterexample::default();
    for (offset, name, value) in entries {
        let time = (offset - earliest) as usize;
        cex.signal_mut(&name).values.insert(time, value);
    }
    cex
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const OUTPUT: &str = "\
Reduce (CSL, rev 6339), 16-Jun-2022 ...
//begin printing system strongest property:
c2!.z - 4 = 0 or c2!.z = 5$
//end printing
Time: 0 ms
//begin printing property result: __GUARANTEE0
2:
{{false,{c1!.x = 3,c2!.z = 4}}}$
Time: 20 ms  plus GC time: 0 ms
//end printing
Quitting
late line
";

    #[test]
    fn test_bands_are_demarcated() {
        let output = read_output(Cursor::new(OUTPUT)).unwrap();
        assert_eq!(output.bands.len(), 2);

        let ssp = output.band(&Band::StrongestProperty).unwrap();
        assert_eq!(ssp.text(), "c2.z - 4 = 0 or c2.z = 5\n");
        assert_eq!(ssp.runtime, None);

        let property = output
            .band(&Band::Property("__GUARANTEE0".to_string()))
            .unwrap();
        assert_eq!(property.text(), "{{false,\n{c1.x = 3,\nc2.z = 4}}}\n");
        assert_eq!(property.runtime, Some(0.02));
        assert!(output.transcript.ends_with("late line\n"));
    }

    #[test]
    fn test_bands_reported_as_they_complete() {
        let mut seen = Vec::new();
        read_output_with(Cursor::new(OUTPUT), |band, output| {
            seen.push((band.clone(), output.bands.len()));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                (Band::StrongestProperty, 1),
                (Band::Property("__GUARANTEE0".to_string()), 2)
            ]
        );
    }

    #[test]
    fn test_strongest_property_display() {
        assert_eq!(display_strongest("a = 1 or b = 2"), "a = 1\n or \nb = 2");
    }

    #[test]
    fn test_counterexample_reproduces_pairs() {
        let mut renaming = Renaming::default();
        renaming.insert("C1.x", "C1.x");
        renaming.insert("C2.z", "C2.z");
        let cex = extract_counterexample("{{false,\n{c1.x = 3,\nc2.z = 4}}}\n", &renaming);
        assert_eq!(cex.signal("C1.x").and_then(|s| s.value(0)), Some("3"));
        assert_eq!(cex.signal("C2.z").and_then(|s| s.value(0)), Some("4"));
        assert_eq!(cex.length(), 1);
    }

    #[test]
    fn test_counterexample_times_are_normalised() {
        let cex = extract_counterexample(
            "{{false,\n{pre#out = 0,\nout = 2,\nnext#in = 1}}}",
            &Renaming::default(),
        );
        assert_eq!(cex.signal("out").and_then(|s| s.value(0)), Some("0"));
        assert_eq!(cex.signal("out").and_then(|s| s.value(1)), Some("2"));
        assert_eq!(cex.signal("in").and_then(|s| s.value(2)), Some("1"));
        assert_eq!(cex.length(), 3);
    }
}
