use crate::{
    config::Separators,
    error::{Error, ReservedHeader},
};

/// Whether the backend answers a request at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `GET` request answered with a fixed16 header and a tabular body.
    Query,
    /// Fire-and-forget mutation, the backend sends nothing back.
    Command,
}

/// Where the column keys of a result come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heading {
    /// Named by a `Columns:` line, every body row is data.
    Columns(Vec<String>),
    /// One key per `Stats:` expression, every body row is data.
    Stats(Vec<String>),
    /// The first body row holds the keys.
    FirstRow,
}

impl Heading {
    /// Infers the heading rule from the outbound statement.
    ///
    /// `Columns:` takes precedence over `Stats:` wherever they appear.
    pub fn infer(statement: &str) -> Self {
        if let Some(columns) = statement
            .lines()
            .find_map(|line| line.strip_prefix("Columns:"))
        {
            return Heading::Columns(columns.split_whitespace().map(String::from).collect());
        }

        let mut stats: Vec<String> = Vec::new();
        for line in statement.lines() {
            if let Some(expr) = line.strip_prefix("Stats:") {
                stats.push(expr.strip_prefix(' ').unwrap_or(expr).to_string());
            } else if let Some(n) = line.strip_prefix("StatsAnd:") {
                fold_stats(&mut stats, n, " && ");
            } else if let Some(n) = line.strip_prefix("StatsOr:") {
                fold_stats(&mut stats, n, " || ");
            }
        }

        if stats.is_empty() {
            Heading::FirstRow
        } else {
            Heading::Stats(stats)
        }
    }
}

// Combines the last `n` stats keys into one, the same way the backend
// combines the filters into a single output column.
fn fold_stats(stats: &mut Vec<String>, n: &str, joiner: &str) {
    let Ok(n) = n.trim().parse::<usize>() else {
        return;
    };
    if n < 2 || n > stats.len() {
        return;
    }

    let folded = stats.split_off(stats.len() - n).join(joiner);
    stats.push(folded);
}

/// Rejects statements carrying header lines the client emits itself.
pub fn check_reserved(statement: &str) -> Result<(), Error> {
    for line in statement.lines() {
        if let Some(header) = ReservedHeader::ALL
            .into_iter()
            .find(|h| line.starts_with(h.prefix()))
        {
            return Err(Error::Reserved(header));
        }
    }
    Ok(())
}

// Leading blank lines would end the request before it starts on the wire.
fn trim_blank_lines(statement: &str) -> &str {
    let mut rest = statement;
    while let Some((line, tail)) = rest.split_once('\n') {
        if !line.trim().is_empty() {
            break;
        }
        rest = tail;
    }
    rest.trim_end()
}

/// A framed, ready-to-send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    kind: RequestKind,
    heading: Heading,
    message: String,
    keepalive: bool,
}

impl Request {
    /// Validates `statement` and appends the client controlled headers.
    pub fn build(statement: &str, separators: &Separators, keepalive: bool) -> Result<Self, Error> {
        if statement.trim().is_empty() {
            return Err(Error::EmptyStatement);
        }
        check_reserved(statement)?;

        let statement = trim_blank_lines(statement);
        let kind = match statement.split_whitespace().next() {
            Some("GET") => RequestKind::Query,
            _ => RequestKind::Command,
        };

        let mut message = String::with_capacity(statement.len() + 64);
        message.push_str(statement);
        message.push('\n');

        if kind == RequestKind::Query {
            message.push_str(&separators.header_line());
            message.push('\n');
            message.push_str("ResponseHeader: fixed16\n");
        }
        if keepalive {
            message.push_str("KeepAlive: on\n");
        }

        let heading = match kind {
            RequestKind::Query => Heading::infer(statement),
            RequestKind::Command => Heading::Columns(Vec::new()),
        };

        Ok(Self {
            kind,
            heading,
            message,
            keepalive,
        })
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn heading(&self) -> &Heading {
        &self.heading
    }

    pub fn keepalive(&self) -> bool {
        self.keepalive
    }

    /// Whether a header and body follow on the wire.
    pub fn expects_response(&self) -> bool {
        self.kind == RequestKind::Query
    }

    /// Wire text, without the blank line that ends a keepalive request.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(statement: &str, keepalive: bool) -> Result<Request, Error> {
        Request::build(statement, &Separators::default(), keepalive)
    }

    #[test]
    fn query_gets_client_headers() {
        let request = build("GET hosts\nColumns: name\n", false).unwrap();

        assert_eq!(request.kind(), RequestKind::Query);
        assert_eq!(
            request.message(),
            "GET hosts\nColumns: name\nSeparators: 10 0 44 124\nResponseHeader: fixed16\n"
        );
    }

    #[test]
    fn query_with_keepalive() {
        let request = build("GET hosts", true).unwrap();

        assert_eq!(
            request.message(),
            "GET hosts\nSeparators: 10 0 44 124\nResponseHeader: fixed16\nKeepAlive: on\n"
        );
    }

    #[test]
    fn command_is_sent_verbatim() {
        let request = build("COMMAND [0] DISABLE_HOST_CHECK;foo\n\n", false).unwrap();

        assert_eq!(request.kind(), RequestKind::Command);
        assert!(!request.expects_response());
        assert_eq!(request.message(), "COMMAND [0] DISABLE_HOST_CHECK;foo\n");

        let request = build("COMMAND [0] DISABLE_HOST_CHECK;foo", true).unwrap();
        assert_eq!(
            request.message(),
            "COMMAND [0] DISABLE_HOST_CHECK;foo\nKeepAlive: on\n"
        );
    }

    #[test]
    fn reserved_headers_are_rejected() {
        let cases = [
            ("GET hosts\nSeparators: 1 2 3 4", 492),
            ("GET hosts\nOutputFormat: json", 493),
            ("GET hosts\nColumnHeaders: on", 494),
            ("GET hosts\nResponseHeader: fixed16", 495),
            ("GET hosts\nKeepAlive: on", 496),
            ("COMMAND [0] FOO\nKeepAlive: on", 496),
        ];

        for (statement, code) in cases {
            let err = build(statement, false).unwrap_err();
            assert_eq!(err.code(), code, "{statement}");
        }
    }

    #[test]
    fn blank_lines_around_statement_are_dropped() {
        let request = build("\n  \nGET hosts\nColumns: name\n \n\t\n", false).unwrap();

        assert_eq!(request.kind(), RequestKind::Query);
        assert_eq!(
            request.message(),
            "GET hosts\nColumns: name\nSeparators: 10 0 44 124\nResponseHeader: fixed16\n"
        );

        let request = build("\r\nCOMMAND [0] FOO \r\n", false).unwrap();
        assert_eq!(request.message(), "COMMAND [0] FOO\n");
    }

    #[test]
    fn empty_statement() {
        assert!(matches!(build(" \n", false), Err(Error::EmptyStatement)));
    }

    #[test]
    fn heading_from_columns() {
        assert_eq!(
            Heading::infer("GET hosts\nColumns: name  alias state"),
            Heading::Columns(vec!["name".into(), "alias".into(), "state".into()])
        );
    }

    #[test]
    fn heading_from_stats() {
        let statement = "GET services\nStats: state = 0\nStats: state = 1\nStats: state = 2";
        assert_eq!(
            Heading::infer(statement),
            Heading::Stats(vec![
                "state = 0".into(),
                "state = 1".into(),
                "state = 2".into()
            ])
        );
    }

    #[test]
    fn heading_folds_stats_and_or() {
        let statement =
            "GET services\nStats: state = 0\nStats: state = 1\nStatsOr: 2\nStats: has_been_checked = 1";
        assert_eq!(
            Heading::infer(statement),
            Heading::Stats(vec![
                "state = 0 || state = 1".into(),
                "has_been_checked = 1".into()
            ])
        );
    }

    #[test]
    fn columns_win_over_stats() {
        let statement = "GET hosts\nStats: sum(x)\nColumns: a b";
        assert_eq!(
            Heading::infer(statement),
            Heading::Columns(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn heading_defaults_to_first_row() {
        assert_eq!(Heading::infer("GET hosts\nFilter: name = x"), Heading::FirstRow);
    }
}
