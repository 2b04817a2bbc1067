use miette::{Diagnostic, LabeledSpan, Report, SourceSpan};

use crate::IndexMap;

#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct SourceId(usize);

impl From<usize> for SourceId {
    fn from(other: usize) -> SourceId {
        SourceId(other)
    }
}

impl From<SourceId> for usize {
    fn from(other: SourceId) -> usize {
        other.0
    }
}

/// Registry of every source buffer known to the compilation, keyed by
/// [`SourceId`]. Buffers are registered as they are discovered: the driver
/// registers the root unit's file, and the module loader registers each
/// imported file it reads. A buffer is never removed or altered once
/// registered, so spans into it stay valid for the life of the process.
///
/// Buffer names are the file paths the content was read from; the module
/// loader leans on this to search the importing file's directory.
#[derive(Default, Debug)]
pub struct SourceMap {
    sources: IndexMap<SourceId, (&'static str, &'static str)>,
}

impl SourceMap {
    // the leak gives the lexer 'static source text without self-referential
    // lifetimes; buffers live until process exit anyway
    pub fn register(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> SourceId {
        let name: &'static str = Box::leak(name.into().into_boxed_str());
        let source: &'static str = Box::leak(source.into().into_boxed_str());
        self.sources.insert((name, source))
    }

    pub fn name(
        &self,
        id: SourceId,
    ) -> &'static str {
        self.sources.get(id).0
    }

    pub fn source(
        &self,
        id: SourceId,
    ) -> &'static str {
        self.sources.get(id).1
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Span {
    source: SourceId,
    span:   SourceSpan,
}

impl Span {
    pub fn new(
        source: SourceId,
        span: SourceSpan,
    ) -> Self {
        Self { source, span }
    }

    pub fn with_item<T>(
        self,
        item: T,
    ) -> SpannedItem<T> {
        SpannedItem(item, self)
    }

    pub fn join(
        &self,
        after_span: Span,
    ) -> Span {
        assert!(self.source == after_span.source, "cannot join spans from different files");

        let (first_span, second_span) = if self.span.offset() < after_span.span.offset() {
            (self.span, after_span.span)
        } else {
            (after_span.span, self.span)
        };

        let first_end = first_span.len() + first_span.offset();
        let second_end = second_span.len() + second_span.offset();
        let end = std::cmp::max(first_end, second_end);
        let length = end - first_span.offset();

        Self {
            source: self.source,
            span:   SourceSpan::new(first_span.offset().into(), length.into()),
        }
    }

    /// goes from the `hi` of self to the `hi` of `after_span`
    pub fn hi_to_hi(
        &self,
        after_span: Span,
    ) -> Self {
        assert!(self.source == after_span.source, "cannot join spans from different files");
        let lo = self.span.offset() + self.span.len();
        let hi = after_span.span.offset() + after_span.span.len();
        Self {
            source: self.source,
            span:   SourceSpan::new(lo.into(), (hi - lo).into()),
        }
    }

    pub fn zero_length(&self) -> Span {
        Self {
            source: self.source,
            span:   SourceSpan::new(self.span.offset().into(), 0.into()),
        }
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn source(&self) -> SourceId {
        self.source
    }
}

#[derive(PartialEq, Eq, Clone)]
pub struct SpannedItem<T>(T, Span);

impl<T> SpannedItem<T> {
    pub fn item(&self) -> &T {
        &self.0
    }

    pub fn item_mut(&mut self) -> &mut T {
        &mut self.0
    }

    pub fn into_item(self) -> T {
        self.0
    }

    pub fn span(&self) -> Span {
        self.1
    }

    pub fn map<U>(
        self,
        f: impl FnOnce(T) -> U,
    ) -> SpannedItem<U> {
        SpannedItem(f(self.0), self.1)
    }
}

impl<T> Copy for SpannedItem<T> where T: Copy {}

impl<T> std::fmt::Debug for SpannedItem<T>
where
    T: std::fmt::Debug,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "SpannedItem {:?} [{:?}]", self.0, self.1)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for SpannedItem<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.item())
    }
}

impl<T: std::error::Error> std::error::Error for SpannedItem<T> {}

impl<T: Diagnostic + std::error::Error> Diagnostic for SpannedItem<T> {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.item().code()
    }

    fn severity(&self) -> Option<miette::Severity> {
        self.item().severity()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.item().help()
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.item().url()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span().span();
        let label = self.item().to_string();
        let labeled_span = LabeledSpan::new_with_span(Some(label), span);
        Some(Box::new(std::iter::once(labeled_span)))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.item().related()
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.item().diagnostic_source()
    }
}

/// Wraps a spanned diagnostic together with the source buffer it points into
/// so miette can render the offending code.
#[derive(Debug)]
struct SourcedItem<T>
where
    T: Diagnostic + std::error::Error + std::fmt::Debug,
{
    name:   String,
    source: String,
    item:   T,
}

impl<T> std::fmt::Display for SourcedItem<T>
where
    T: Diagnostic + std::error::Error + std::fmt::Debug,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.item)
    }
}

impl<T: std::error::Error> std::error::Error for SourcedItem<T> where T: Diagnostic + std::error::Error + std::fmt::Debug {}

impl<T: Diagnostic> Diagnostic for SourcedItem<T>
where
    T: Diagnostic + std::error::Error + std::fmt::Debug,
{
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.item.code()
    }

    fn severity(&self) -> Option<miette::Severity> {
        self.item.severity()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.item.help()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.item.labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.item.related()
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.item.diagnostic_source()
    }
}

/// Attach the originating source buffer to a spanned diagnostic and produce a
/// renderable report. The binder only collects diagnostics; rendering is the
/// driver's business.
pub fn render_error<T>(
    sources: &SourceMap,
    err: SpannedItem<T>,
) -> Report
where
    T: Diagnostic + Send + Sync + 'static,
{
    let source_id = err.span().source();
    Report::new(SourcedItem {
        name:   sources.name(source_id).to_string(),
        source: sources.source(source_id).to_string(),
        item:   err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans() -> (Span, Span) {
        let mut sources = SourceMap::default();
        let source = sources.register("test.sb", "import dep");
        (Span::new(source, (0..6).into()), Span::new(source, (7..10).into()))
    }

    #[test]
    fn join_covers_both_spans_in_either_order() {
        let (lo, hi) = spans();
        for joined in [lo.join(hi), hi.join(lo)] {
            assert_eq!(joined.span().offset(), 0);
            assert_eq!(joined.span().len(), 10);
        }
    }

    #[test]
    fn hi_to_hi_spans_between_the_ends() {
        let (lo, hi) = spans();
        let between = lo.hi_to_hi(hi);
        assert_eq!(between.span().offset(), 6);
        assert_eq!(between.span().len(), 4);
    }

    #[test]
    fn zero_length_keeps_the_offset() {
        let (_, hi) = spans();
        let collapsed = hi.zero_length();
        assert_eq!(collapsed.span().offset(), 7);
        assert_eq!(collapsed.span().len(), 0);
    }
}
