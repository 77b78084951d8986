//! Intermediate results document
//!
//! The orchestrator writes one `<Property>` entry per property while a
//! parser thread tails the same file and turns each completed entry into a
//! [`PropertyResult`]. The parser keeps polling at end of file until the
//! document is marked done, then reads once more and stops.

use crate::error::{Result, SolverError};
use crate::result::{Counterexample, PropertyResult, Verdict};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Writes the results document entry by entry
pub struct DocumentWriter<W: Write> {
    out: W,
}

impl<W: Write> DocumentWriter<W> {
    pub fn begin(mut out: W) -> io::Result<Self> {
        writeln!(out, "<?xml version=\"1.0\"?>")?;
        writeln!(out, "<Results>")?;
        out.flush()?;
        Ok(Self { out })
    }

    pub fn write_property(&mut self, property: &PropertyResult) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out, "  <Property name=\"{}\">", escape(property.name.as_str()))?;
        writeln!(out, "    <Runtime unit=\"sec\">{}</Runtime>", property.runtime)?;
        writeln!(out, "    <Answer>{}</Answer>", property.verdict)?;
        if let Some(cex) = &property.counterexample {
            writeln!(out, "    <Counterexample>")?;
            for signal in cex.signals.values() {
                writeln!(out, "      <Signal name=\"{}\">", escape(signal.name.as_str()))?;
                for (time, value) in &signal.values {
                    writeln!(
                        out,
                        "        <Value time=\"{}\">{}</Value>",
                        time,
                        escape(value.as_str())
                    )?;
                }
                writeln!(out, "      </Signal>")?;
            }
            writeln!(out, "    </Counterexample>")?;
        }
        writeln!(out, "  </Property>")?;
        out.flush()
    }

    pub fn end(mut self) -> io::Result<W> {
        writeln!(self.out, "</Results>")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Parse one `<Property>` element
pub fn parse_property(xml: &str) -> Result<PropertyResult> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut name = None;
    let mut runtime = 0.0;
    let mut answer = None;
    let mut counterexample: Option<Counterexample> = None;
    let mut signal: Option<String> = None;
    let mut time: Option<usize> = None;
    let mut element = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                match start.name().as_ref() {
                    b"Property" => name = Some(attribute(&start, "name")?),
                    b"Counterexample" => counterexample = Some(Counterexample::default()),
                    b"Signal" => {
                        let signal_name = attribute(&start, "name")?;
                        if let Some(cex) = counterexample.as_mut() {
                            cex.signal_mut(&signal_name);
                        }
                        signal = Some(signal_name);
                    }
                    b"Value" => {
                        let text = attribute(&start, "time")?;
                        time = Some(text.parse().map_err(|_| {
                            SolverError::Document(format!("Invalid time step: {}", text))
                        })?);
                    }
                    _ => {}
                }
                element = start.name().as_ref().to_vec();
            }
            Event::Text(text) => {
                let text = text.unescape()?.into_owned();
                match element.as_slice() {
                    b"Runtime" => {
                        runtime = text.parse().map_err(|_| {
                            SolverError::Document(format!("Invalid runtime: {}", text))
                        })?
                    }
                    b"Answer" => answer = Some(text),
                    b"Value" => {
                        if let (Some(cex), Some(signal), Some(time)) =
                            (counterexample.as_mut(), signal.as_deref(), time)
                        {
                            cex.signal_mut(signal).values.insert(time, text);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => element.clear(),
            Event::Eof => break,
            _ => {}
        }
    }

    let name = name.ok_or_else(|| SolverError::Document(format!("No property in: {}", xml)))?;
    let answer =
        answer.ok_or_else(|| SolverError::Document(format!("No answer for property {}", name)))?;
    let verdict = answer.parse::<Verdict>().map_err(SolverError::Document)?;
    Ok(PropertyResult {
        name,
        verdict,
        runtime,
        counterexample,
    })
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<String> {
    match start.try_get_attribute(name)? {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Err(SolverError::Document(format!(
            "Element {} has no attribute {}",
            String::from_utf8_lossy(start.name().as_ref()),
            name
        ))),
    }
}

/// Thread tailing a results document
pub struct DocumentParser {
    done: Arc<AtomicBool>,
    handle: JoinHandle<Result<usize>>,
}

impl DocumentParser {
    /// Start tailing `path`, calling `on_property` for every entry parsed
    pub fn spawn<F>(path: PathBuf, mut on_property: F) -> Result<Self>
    where
        F: FnMut(PropertyResult) + Send + 'static,
    {
        let done = Arc::new(AtomicBool::new(false));
        let finished = Arc::clone(&done);
        let handle = thread::Builder::new()
            .name("redcomp-document".to_string())
            .spawn(move || {
                let mut count = 0;
                tail(&path, &finished, |entry| {
                    on_property(parse_property(entry)?);
                    count += 1;
                    Ok(())
                })?;
                Ok(count)
            })?;
        Ok(Self { done, handle })
    }

    /// Mark the document complete and wait for the final read.
    ///
    /// Returns the number of entries parsed.
    pub fn finish(self) -> Result<usize> {
        self.done.store(true, Ordering::SeqCst);
        self.handle.join().map_err(|_| SolverError::WorkerPanicked)?
    }
}

fn tail(
    path: &Path,
    done: &AtomicBool,
    mut on_entry: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let mut reader = loop {
        let finished = done.load(Ordering::SeqCst);
        match File::open(path) {
            Ok(file) => break BufReader::new(file),
            Err(_) if finished => return Ok(()),
            Err(_) => thread::sleep(POLL_INTERVAL),
        }
    };

    let mut line = String::new();
    let mut entry: Option<String> = None;
    loop {
        let finished = done.load(Ordering::SeqCst);
        let read = reader.read_line(&mut line)?;
        if read == 0 || !line.ends_with('\n') {
            if finished {
                break;
            }
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        if line.contains("<Property ") {
            entry = Some(String::new());
        }
        if let Some(buffer) = entry.as_mut() {
            buffer.push_str(&line);
        }
        if line.contains("</Property>") {
            if let Some(buffer) = entry.take() {
                debug!(bytes = buffer.len(), "parsing property entry");
                on_entry(&buffer)?;
            }
        }
        line.clear();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Signal;
    use std::collections::BTreeMap;

    fn falsified() -> PropertyResult {
        let mut cex = Counterexample::default();
        cex.signals.insert(
            "C1.x".to_string(),
            Signal {
                name: "C1.x".to_string(),
                values: BTreeMap::from([(0, "3".to_string())]),
            },
        );
        cex.signal_mut("a<b").values.insert(1, "-1".to_string());
        PropertyResult {
            name: "__GUARANTEE0".to_string(),
            verdict: Verdict::Falsifiable,
            runtime: 0.02,
            counterexample: Some(cex),
        }
    }

    #[test]
    fn test_written_entry_parses_back() {
        let mut writer = DocumentWriter::begin(Vec::new()).unwrap();
        writer.write_property(&falsified()).unwrap();
        let text = String::from_utf8(writer.end().unwrap()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\"?>\n<Results>\n"));
        assert!(text.contains("<Signal name=\"a&lt;b\">"));

        let start = text.find("  <Property").unwrap();
        let end = text.find("</Results>").unwrap();
        assert_eq!(parse_property(&text[start..end]).unwrap(), falsified());
    }

    #[test]
    fn test_unknown_answer_rejected() {
        let err = parse_property(
            "<Property name=\"p\"><Runtime unit=\"sec\">0</Runtime><Answer>maybe</Answer></Property>",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error parsing results document: Unknown property answer: maybe"
        );
    }

    #[test]
    fn test_parser_tails_until_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml");
        let (sender, receiver) = crossbeam::channel::unbounded();
        let parser = DocumentParser::spawn(path.clone(), move |result| {
            let _ = sender.send(result);
        })
        .unwrap();

        let file = File::create(&path).unwrap();
        let mut writer = DocumentWriter::begin(file).unwrap();
        writer.write_property(&falsified()).unwrap();
        let first = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("entry parsed while the document is open");
        assert_eq!(first.name, "__GUARANTEE0");

        writer
            .write_property(&PropertyResult {
                name: "__GUARANTEE1".to_string(),
                verdict: Verdict::Valid,
                runtime: 0.5,
                counterexample: None,
            })
            .unwrap();
        writer.end().unwrap();
        assert_eq!(parser.finish().unwrap(), 2);
        assert_eq!(receiver.try_recv().unwrap().verdict, Verdict::Valid);
    }

    #[test]
    fn test_parser_without_document_stops_when_done() {
        let dir = tempfile::tempdir().unwrap();
        let parser = DocumentParser::spawn(dir.path().join("missing.xml"), |_| {}).unwrap();
        assert_eq!(parser.finish().unwrap(), 0);
    }
}
