use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;

use crate::annotate::{AnnotateConfig, AnnotateStats, GatewayClient, annotate_dom};
use crate::parsers::html::{get_charset, get_title, html_to_dom, serialize_document};

/// Represents errors that can occur during finmark processing
///
/// This error type encapsulates all possible errors that can occur
/// when annotating a document with the finmark library.
#[derive(Debug)]
pub struct FinmarkError {
    details: String,
}

impl FinmarkError {
    /// Creates a new FinmarkError with the given message
    ///
    /// # Arguments
    ///
    /// * `msg` - The error message describing what went wrong
    ///
    /// # Returns
    ///
    /// A new FinmarkError instance
    pub fn new(msg: &str) -> FinmarkError {
        FinmarkError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for FinmarkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for FinmarkError {
    fn description(&self) -> &str {
        &self.details
    }
}

/// Configuration options for finmark processing
///
/// This struct contains the options that control how a document is
/// annotated and what gets injected into the output.
#[derive(Default, Clone)]
pub struct FinmarkOptions {
    pub api_url: Option<String>,
    pub batch_size: Option<usize>,
    pub config_file: Option<PathBuf>,
    pub encoding: Option<String>,
    pub no_overlay: bool,
    pub passes: usize,
    pub silent: bool,
    pub timeout: u64,
}

impl FinmarkOptions {
    /// Builds the pipeline configuration from config file, environment
    /// and command-line overrides, in that order of precedence.
    pub fn resolve_config(&self) -> Result<AnnotateConfig, FinmarkError> {
        let mut config = AnnotateConfig::load(self.config_file.as_deref())?;
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.timeout > 0 {
            config.request_timeout_secs = self.timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parses input bytes into a DOM, honoring the document's declared
/// charset when no explicit encoding override is given.
fn parse_with_charset_sniff(
    input_data: &[u8],
    input_encoding: Option<String>,
) -> Result<(RcDom, String), FinmarkError> {
    if let Some(label) = &input_encoding {
        if Encoding::for_label_no_replacement(label.as_bytes()).is_none() {
            return Err(FinmarkError::new(&format!("unknown encoding: {}", label)));
        }
        let dom = html_to_dom(input_data, label.clone());
        return Ok((dom, label.clone()));
    }

    let dom = html_to_dom(input_data, "utf-8".to_string());
    if let Some(charset) = get_charset(&dom.document) {
        if !charset.eq_ignore_ascii_case("utf-8")
            && Encoding::for_label_no_replacement(charset.as_bytes()).is_some()
        {
            let dom = html_to_dom(input_data, charset.clone());
            return Ok((dom, charset));
        }
    }
    Ok((dom, "utf-8".to_string()))
}

/// Annotates an HTML document held in memory
///
/// Scans the document for financial terms, classifies them through the
/// remote gateway, wraps recognized terms in tooltip markers and, unless
/// disabled, injects the tooltip overlay. Returns the serialized
/// document together with its title.
pub async fn annotate_document_from_data(
    options: &FinmarkOptions,
    input_data: Vec<u8>,
    input_encoding: Option<String>,
) -> Result<(Vec<u8>, Option<String>), FinmarkError> {
    let config = Arc::new(options.resolve_config()?);
    let (dom, document_encoding) = parse_with_charset_sniff(&input_data, input_encoding)?;

    let classifier = GatewayClient::new(&config)?;
    let passes = if options.passes > 0 { options.passes } else { 1 };
    let stats: AnnotateStats =
        annotate_dom(&dom, classifier, config.clone(), passes, !options.no_overlay).await?;

    if !options.silent {
        tracing::info!(
            entries = stats.queue.rendered_entries,
            terms = stats.queue.marked_terms,
            passes = stats.passes,
            "document annotation finished"
        );
    }

    let document_title = get_title(&dom.document);
    let output_encoding = options
        .encoding
        .clone()
        .unwrap_or(document_encoding);
    let result = serialize_document(dom, output_encoding);

    Ok((result, document_title))
}
