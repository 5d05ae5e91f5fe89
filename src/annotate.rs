use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use gloss_catalog::Catalog;
use gloss_text::{Tokens, classify, normalize};
use gloss_types::{AnnotateConfig, Decision, DictionaryMode};
use serde::{Serialize, Serializer};
use tracing::info;

use crate::cache::DefinitionCache;
use crate::overlay::TagRef;
use crate::resolver::{Resolution, Resolver};

/// Where a tagged term's definition comes from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SpanSource {
    /// Inline definition from a static dictionary.
    Catalog {
        definition: String,
        #[serde(serialize_with = "serialize_mode")]
        dictionary: DictionaryMode,
    },
    /// Definition lives in the session cache and is read at display time.
    SimpleEnglish,
}

/// A tagged unit of output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AnnotatedSpan {
    /// Raw token text as it appeared in the document.
    pub display: String,
    /// Normalized term used as the lookup key.
    pub term: String,
    #[serde(flatten)]
    pub source: SpanSource,
}

impl AnnotatedSpan {
    pub fn tag_ref(&self) -> TagRef {
        match &self.source {
            SpanSource::Catalog {
                definition,
                dictionary,
            } => TagRef::Catalog {
                term: self.term.clone(),
                definition: definition.clone(),
                source: dictionary.as_str().to_string(),
            },
            SpanSource::SimpleEnglish => TagRef::SimpleEnglish {
                term: self.term.clone(),
            },
        }
    }

    fn write_markup(&self, out: &mut String) {
        match &self.source {
            SpanSource::Catalog {
                definition,
                dictionary,
            } => {
                out.push_str(r#"<span class="sci-term" data-term=""#);
                out.push_str(&escape_attr(&self.term));
                out.push_str(r#"" data-definition=""#);
                out.push_str(&escape_attr(definition));
                out.push_str(r#"" data-source=""#);
                out.push_str(dictionary.as_str());
                out.push_str(r#"">"#);
            }
            SpanSource::SimpleEnglish => {
                out.push_str(r#"<span class="simple-term" data-term=""#);
                out.push_str(&escape_attr(&self.term));
                out.push_str(r#"">"#);
            }
        }
        out.push_str(&escape_attr(&self.display));
        out.push_str("</span>");
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    Term(AnnotatedSpan),
}

/// Result of one annotation run, in document order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct AnnotatedDocument {
    pub segments: Vec<Segment>,
    pub catalog_terms: usize,
    pub simple_terms: usize,
    pub lookups_timed_out: usize,
}

impl AnnotatedDocument {
    fn push_text(&mut self, text: &str) {
        if let Some(Segment::Text { text: last }) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Text {
                text: text.to_string(),
            });
        }
    }

    fn push_term(&mut self, span: AnnotatedSpan) {
        match span.source {
            SpanSource::Catalog { .. } => self.catalog_terms += 1,
            SpanSource::SimpleEnglish => self.simple_terms += 1,
        }
        self.segments.push(Segment::Term(span));
    }

    /// Tagged spans in document order.
    pub fn spans(&self) -> impl Iterator<Item = &AnnotatedSpan> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Term(span) => Some(span),
            Segment::Text { .. } => None,
        })
    }

    /// The original text, reassembled from segments.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text { text } => text.as_str(),
                Segment::Term(span) => span.display.as_str(),
            })
            .collect()
    }

    /// Serialize to HTML markup: untagged text is escaped as text content,
    /// tagged terms become `<span>` elements with escaped attributes.
    pub fn render_markup(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text { text } => out.push_str(&escape_text(text)),
                Segment::Term(span) => span.write_markup(&mut out),
            }
        }
        out
    }
}

/// Drives tokens through the classifier and resolver in document order.
pub struct Annotator {
    catalog: Arc<Catalog>,
    resolver: Arc<Resolver>,
}

impl Annotator {
    pub fn new(catalog: Arc<Catalog>, resolver: Arc<Resolver>) -> Self {
        Self { catalog, resolver }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &DefinitionCache {
        self.resolver.cache()
    }

    /// Annotate `text` under `config`.
    ///
    /// External candidates are awaited one at a time, so output order always
    /// matches input order. A word whose lookup timed out is not retried for
    /// the rest of this run.
    pub async fn annotate(&self, text: &str, config: &AnnotateConfig) -> AnnotatedDocument {
        let mut doc = AnnotatedDocument::default();
        let mut timed_out: HashSet<String> = HashSet::new();

        for token in Tokens::new(text) {
            let normalized = normalize(token.text);
            let decision = classify(&token, &normalized, config, |mode, term| {
                self.catalog.lookup(mode, term)
            });
            match decision {
                Decision::PassThrough | Decision::Skip => doc.push_text(token.text),
                Decision::CatalogTerm {
                    definition,
                    dictionary,
                } => doc.push_term(AnnotatedSpan {
                    display: token.text.to_string(),
                    term: normalized,
                    source: SpanSource::Catalog {
                        definition: definition.to_string(),
                        dictionary,
                    },
                }),
                Decision::ExternalCandidate => {
                    if timed_out.contains(&normalized) {
                        doc.push_text(token.text);
                        continue;
                    }
                    match self.resolver.resolve(&normalized).await {
                        Resolution::Defined(_) => doc.push_term(AnnotatedSpan {
                            display: token.text.to_string(),
                            term: normalized,
                            source: SpanSource::SimpleEnglish,
                        }),
                        Resolution::Absent => doc.push_text(token.text),
                        Resolution::TimedOut => {
                            doc.lookups_timed_out += 1;
                            timed_out.insert(normalized);
                            doc.push_text(token.text);
                        }
                    }
                }
            }
        }

        info!(
            bytes = text.len(),
            dictionary = %config.dictionary_mode,
            catalog_terms = doc.catalog_terms,
            simple_terms = doc.simple_terms,
            timed_out = doc.lookups_timed_out,
            "annotated document"
        );
        doc
    }
}

/// Escape `& < > " '` for use inside a double-quoted attribute or element body.
pub fn escape_attr(raw: &str) -> Cow<'_, str> {
    escape_with(raw, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    })
}

/// Escape `& < >`, the minimum for literal text content.
pub fn escape_text(raw: &str) -> Cow<'_, str> {
    escape_with(raw, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    })
}

fn escape_with(raw: &str, entity: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = raw.find(|c: char| entity(c).is_some()) else {
        return Cow::Borrowed(raw);
    };
    let mut out = String::with_capacity(raw.len() + 16);
    out.push_str(&raw[..first]);
    for c in raw[first..].chars() {
        match entity(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn serialize_mode<S: Serializer>(mode: &DictionaryMode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(mode.as_str())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::resolver::tests::FakeSource;
    use crate::source::DefinitionSource;

    fn annotator(source: &Arc<FakeSource>) -> Annotator {
        let source: Arc<dyn DefinitionSource> = source.clone();
        let resolver = Resolver::new(source, Arc::new(DefinitionCache::new()));
        Annotator::new(Arc::new(Catalog::builtin()), Arc::new(resolver))
    }

    fn micro(simple_english: bool) -> AnnotateConfig {
        AnnotateConfig {
            dictionary_mode: DictionaryMode::Micro,
            scientific: true,
            simple_english,
        }
    }

    #[tokio::test]
    async fn tags_catalog_terms_in_order() {
        let source = Arc::new(FakeSource::new(&[]));
        let annotator = annotator(&source);
        let doc = annotator
            .annotate("The pathogen and the dog ran.", &micro(false))
            .await;

        assert_eq!(
            doc.segments,
            vec![
                Segment::Text {
                    text: "The ".into()
                },
                Segment::Term(AnnotatedSpan {
                    display: "pathogen".into(),
                    term: "pathogen".into(),
                    source: SpanSource::Catalog {
                        definition: "A microorganism that can cause disease.".into(),
                        dictionary: DictionaryMode::Micro,
                    },
                }),
                Segment::Text {
                    text: " and the dog ran.".into()
                },
            ]
        );
        assert_eq!(
            doc.render_markup(),
            "The <span class=\"sci-term\" data-term=\"pathogen\" \
             data-definition=\"A microorganism that can cause disease.\" \
             data-source=\"micro\">pathogen</span> and the dog ran."
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn simple_english_terms_defer_to_the_cache() {
        let source = Arc::new(FakeSource::new(&[
            ("dog", Ok(Some("A domesticated canine."))),
            ("ran", Ok(Some("Moved swiftly."))),
        ]));
        let annotator = annotator(&source);
        let doc = annotator
            .annotate("The pathogen and the dog ran.", &micro(true))
            .await;

        let terms: Vec<(&str, &SpanSource)> = doc
            .spans()
            .map(|span| (span.term.as_str(), &span.source))
            .collect();
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0].0, "pathogen");
        assert_eq!(terms[1], ("dog", &SpanSource::SimpleEnglish));
        assert_eq!(terms[2], ("ran", &SpanSource::SimpleEnglish));
        assert_eq!(doc.simple_terms, 2);
        assert!(
            doc.render_markup()
                .contains(r#"<span class="simple-term" data-term="dog">dog</span>"#)
        );
        assert_eq!(
            annotator.cache().definition("dog").as_deref(),
            Some("A domesticated canine.")
        );
        // "the" and "and" are stoplisted; "pathogen" is a catalog term.
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn unresolved_candidates_fall_back_to_plain_text() {
        let source = Arc::new(FakeSource::new(&[("broken", Err("shape"))]));
        let annotator = annotator(&source);
        let text = "zzxq broken words";
        let doc = annotator.annotate(text, &micro(true)).await;
        assert_eq!(doc.spans().count(), 0);
        assert_eq!(doc.render_markup(), text);
        assert_eq!(doc.segments.len(), 1);
    }

    #[tokio::test]
    async fn reannotation_is_idempotent_and_served_from_cache() {
        let source = Arc::new(FakeSource::new(&[("dog", Ok(Some("A canine.")))]));
        let annotator = annotator(&source);
        let text = "A dog, another dog; Osmosis & pathogen <b>.";
        let config = AnnotateConfig {
            dictionary_mode: DictionaryMode::Combined,
            scientific: true,
            simple_english: true,
        };
        let first = annotator.annotate(text, &config).await;
        let calls = source.calls();
        let second = annotator.annotate(text, &config).await;
        assert_eq!(first, second);
        assert_eq!(first.render_markup(), second.render_markup());
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn plain_text_round_trips() {
        let source = Arc::new(FakeSource::new(&[("dog", Ok(Some("A canine.")))]));
        let annotator = annotator(&source);
        for text in [
            "",
            "  pathogen\t\n",
            "a <dog> & \"pathogen\"'s [biofilm]!",
            "ünïcödé pathogen, 日本語",
        ] {
            let doc = annotator.annotate(text, &micro(true)).await;
            assert_eq!(doc.plain_text(), text);
        }
    }

    #[tokio::test]
    async fn markup_escapes_text_and_attributes() {
        let source = Arc::new(FakeSource::new(&[]));
        let annotator = annotator(&source);
        let doc = annotator
            .annotate("<script>alert(1)</script> & pathogen", &micro(false))
            .await;
        let markup = doc.render_markup();
        assert!(
            markup.starts_with("&lt;script&gt;alert(1)&lt;/script&gt; &amp; <span "),
            "{markup}"
        );
    }

    #[test]
    fn definitions_with_markup_are_escaped_in_attributes() {
        let span = AnnotatedSpan {
            display: "x\"y".into(),
            term: "x\"y".into(),
            source: SpanSource::Catalog {
                definition: "<script>alert('x')</script> & \"more\"".into(),
                dictionary: DictionaryMode::Chemistry,
            },
        };
        let doc = AnnotatedDocument {
            segments: vec![Segment::Term(span)],
            ..AnnotatedDocument::default()
        };
        let markup = doc.render_markup();
        assert!(!markup.contains("<script>"));
        assert!(markup.contains(
            "data-definition=\"&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;more&quot;\""
        ));
        assert!(markup.contains("data-term=\"x&quot;y\""));
        assert!(markup.ends_with(">x&quot;y</span>"));
    }

    #[test]
    fn escaping_borrows_when_nothing_changes() {
        assert!(matches!(escape_attr("plain"), Cow::Borrowed("plain")));
        assert!(matches!(escape_text("it's \"ok\""), Cow::Borrowed(_)));
        assert_eq!(escape_attr("a'b"), "a&#39;b");
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_words_are_not_retried_within_a_run() {
        let source = Arc::new(
            FakeSource::new(&[("slow", Ok(Some("Eventually.")))])
                .with_delay(Duration::from_secs(60)),
        );
        let dyn_source: Arc<dyn DefinitionSource> = source.clone();
        let resolver = Resolver::new(dyn_source, Arc::new(DefinitionCache::new()))
            .with_timeout(Duration::from_secs(1));
        let annotator = Annotator::new(Arc::new(Catalog::builtin()), Arc::new(resolver));

        let doc = annotator.annotate("slow slow slow", &micro(true)).await;
        assert_eq!(doc.render_markup(), "slow slow slow");
        assert_eq!(doc.lookups_timed_out, 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(annotator.cache().get("slow"), None);
    }

    #[test]
    fn serializes_segments_with_tags() {
        let doc = AnnotatedDocument {
            segments: vec![
                Segment::Text { text: "a ".into() },
                Segment::Term(AnnotatedSpan {
                    display: "Genome".into(),
                    term: "genome".into(),
                    source: SpanSource::Catalog {
                        definition: "All the DNA.".into(),
                        dictionary: DictionaryMode::Genetics,
                    },
                }),
            ],
            catalog_terms: 1,
            ..AnnotatedDocument::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["segments"][0]["kind"], "text");
        assert_eq!(value["segments"][1]["kind"], "term");
        assert_eq!(value["segments"][1]["source"], "catalog");
        assert_eq!(value["segments"][1]["dictionary"], "genetics");
        assert_eq!(value["segments"][1]["display"], "Genome");
        assert_eq!(value["catalog_terms"], 1);
    }
}
