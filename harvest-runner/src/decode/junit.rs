// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JUnit XML decoding.
//!
//! The supported grammar is the common subset written by test frameworks:
//!
//! ```text
//! <testsuites>
//!   <testsuite name="...">
//!     <testsuite name="...">...</testsuite>
//!     <testcase name="..." classname="...">
//!       <failure message="...">text</failure> | <error .../> | <skipped .../>
//!       <system-out>...</system-out>
//!       <system-err>...</system-err>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! A bare `<testsuite>` is also accepted as the root element. Elements outside this grammar
//! (for example `<properties>`) are skipped.

use super::{DecodeArtifact, detail_keys};
use crate::errors::DecodeError;
use harvest_metadata::{ResultNode, Status};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

const TESTSUITES_TAG: &[u8] = b"testsuites";
const TESTSUITE_TAG: &[u8] = b"testsuite";
const TESTCASE_TAG: &[u8] = b"testcase";
const FAILURE_TAG: &[u8] = b"failure";
const ERROR_TAG: &[u8] = b"error";
const SKIPPED_TAG: &[u8] = b"skipped";
const SYSTEM_OUT_TAG: &[u8] = b"system-out";
const SYSTEM_ERR_TAG: &[u8] = b"system-err";

/// Decoder for JUnit XML reports.
///
/// The artifact becomes a branch named after the file, with one child per test suite. Each
/// suite holds one leaf per test case:
///
/// | test case contains          | status    |
/// |-----------------------------|-----------|
/// | nothing                     | `passed`  |
/// | `<failure>` or `<error>`    | `failed`  |
/// | `<skipped>`                 | `unknown` |
///
/// A suite without test cases is a leaf with an unset status.
#[derive(Clone, Copy, Debug, Default)]
pub struct JunitDecoder;

impl DecodeArtifact for JunitDecoder {
    fn decode(&self, bytes: &[u8], name: &str) -> Result<ResultNode, DecodeError> {
        let suites = ReportParser::default().parse(bytes)?;
        Ok(ResultNode::branch(name, suites))
    }
}

#[derive(Debug)]
struct OpenElement {
    tag: String,
    kind: OpenKind,
}

#[derive(Debug)]
enum OpenKind {
    Suites,
    Suite(ResultNode),
    Case(ResultNode),
    Outcome {
        key: &'static str,
        status: Status,
        message: Option<String>,
        text: String,
    },
    Output {
        key: &'static str,
        text: String,
    },
    Ignored,
}

#[derive(Debug, Default)]
struct ReportParser {
    stack: Vec<OpenElement>,
    suites: Vec<ResultNode>,
    seen_root: bool,
}

impl ReportParser {
    fn parse(mut self, bytes: &[u8]) -> Result<Vec<ResultNode>, DecodeError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => self.open(&e)?,
                Event::Empty(e) => {
                    self.open(&e)?;
                    self.close();
                }
                Event::End(_) => self.close(),
                Event::Text(e) => {
                    let text = e.unescape()?;
                    self.push_text(&text);
                }
                Event::CData(e) => self.push_text(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = self.stack.pop() {
            return Err(DecodeError::Truncated { element: open.tag });
        }
        if !self.seen_root {
            return Err(DecodeError::MissingRoot);
        }
        Ok(self.suites)
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), DecodeError> {
        let tag = e.name();
        let tag = tag.as_ref();

        let kind = match self.stack.last().map(|open| &open.kind) {
            None => match tag {
                TESTSUITES_TAG => OpenKind::Suites,
                TESTSUITE_TAG => OpenKind::Suite(ResultNode::new(attribute(e, "name")?)),
                other => {
                    return Err(DecodeError::UnexpectedRoot {
                        found: String::from_utf8_lossy(other).into_owned(),
                    });
                }
            },
            Some(OpenKind::Suites) => match tag {
                TESTSUITE_TAG => OpenKind::Suite(ResultNode::new(attribute(e, "name")?)),
                _ => OpenKind::Ignored,
            },
            Some(OpenKind::Suite(_)) => match tag {
                TESTSUITE_TAG => OpenKind::Suite(ResultNode::new(attribute(e, "name")?)),
                TESTCASE_TAG => {
                    let mut case = ResultNode::new(attribute(e, "name")?);
                    let classname = attribute(e, "classname")?;
                    if !classname.is_empty() {
                        case.details
                            .insert(detail_keys::CLASSNAME.to_owned(), classname);
                    }
                    OpenKind::Case(case)
                }
                SYSTEM_OUT_TAG => output(detail_keys::SYSTEM_OUT),
                SYSTEM_ERR_TAG => output(detail_keys::SYSTEM_ERR),
                _ => OpenKind::Ignored,
            },
            Some(OpenKind::Case(_)) => match tag {
                FAILURE_TAG | ERROR_TAG => outcome(e, detail_keys::FAILURE, Status::Failed)?,
                SKIPPED_TAG => outcome(e, detail_keys::SKIPPED, Status::Unknown)?,
                SYSTEM_OUT_TAG => output(detail_keys::SYSTEM_OUT),
                SYSTEM_ERR_TAG => output(detail_keys::SYSTEM_ERR),
                _ => OpenKind::Ignored,
            },
            Some(OpenKind::Outcome { .. } | OpenKind::Output { .. } | OpenKind::Ignored) => {
                OpenKind::Ignored
            }
        };

        self.seen_root = true;
        self.stack.push(OpenElement {
            tag: String::from_utf8_lossy(tag).into_owned(),
            kind,
        });
        Ok(())
    }

    fn push_text(&mut self, s: &str) {
        if let Some(OpenElement {
            kind: OpenKind::Outcome { text, .. } | OpenKind::Output { text, .. },
            ..
        }) = self.stack.last_mut()
        {
            text.push_str(s);
        }
    }

    // The reader checks that end tags match their start tags, so the element being closed is
    // always the top of the stack.
    fn close(&mut self) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        let parent = self.stack.last_mut().map(|open| &mut open.kind);

        match open.kind {
            OpenKind::Suites | OpenKind::Ignored => {}
            OpenKind::Suite(suite) => match parent {
                Some(OpenKind::Suite(parent)) => parent.children.push(suite),
                _ => self.suites.push(suite),
            },
            OpenKind::Case(mut case) => {
                case.status.get_or_insert(Status::Passed);
                if let Some(OpenKind::Suite(parent)) = parent {
                    parent.children.push(case);
                }
            }
            OpenKind::Outcome {
                key,
                status,
                message,
                text,
            } => {
                if let Some(OpenKind::Case(case)) = parent {
                    // A failure outranks a skip if a test case somehow reports both.
                    if case.status != Some(Status::Failed) {
                        case.status = Some(status);
                    }
                    case.details
                        .insert(key.to_owned(), join_message(message, text));
                }
            }
            OpenKind::Output { key, text } => {
                if let Some(OpenKind::Case(node) | OpenKind::Suite(node)) = parent {
                    node.details.insert(key.to_owned(), text);
                }
            }
        }
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<String, DecodeError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?;
    match attr {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Ok(String::new()),
    }
}

fn outcome(
    e: &BytesStart<'_>,
    key: &'static str,
    status: Status,
) -> Result<OpenKind, DecodeError> {
    let message = attribute(e, "message")?;
    Ok(OpenKind::Outcome {
        key,
        status,
        message: (!message.is_empty()).then_some(message),
        text: String::new(),
    })
}

fn output(key: &'static str) -> OpenKind {
    OpenKind::Output {
        key,
        text: String::new(),
    }
}

fn join_message(message: Option<String>, text: String) -> String {
    match message {
        Some(message) if text.is_empty() => message,
        Some(message) => format!("{message}\n{text}"),
        None => text,
    }
}
