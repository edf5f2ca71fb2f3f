//! Fetching and parsing of hiscores ranking pages.
//!
//! A ranking page is 25 rows of `[rank, player, level, xp]`, 1-based page
//! numbering, sorted by descending value. [`Hiscores`] wraps the HTTP GET,
//! proxy rotation, retries and rate-limit detection behind the
//! [`PageSource`] trait so the rank finder can be driven by fixtures in
//! tests.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::error::FetchError;
use crate::proxy::{Proxy, ProxyRotator};
use crate::skill::Skill;

/// Sent with every ranking request so the operators can identify us.
pub const USER_AGENT: &str =
    "RuneScape Wiki hiscore counts updater (maintained by the wiki team)";

/// Attempts per page before giving up on a cell.
pub const RETRY_LIMIT: u32 = 10;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Which ladder a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Main,
    Ironman,
}

impl Direction {
    fn base_url(self) -> &'static str {
        match self {
            Direction::Main => "https://secure.runescape.com/m=hiscore/ranking",
            Direction::Ironman => "https://secure.runescape.com/m=hiscore_ironman/ranking",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Main => "main",
            Direction::Ironman => "ironman",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed row of a ranking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub rank: u64,
    pub player: String,
    pub level: u32,
    pub xp: u64,
}

/// A parsed ranking page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiscoresPage {
    /// Rows in page order (descending value).
    pub rows: Vec<RankedRow>,
    /// Last page number advertised by the pagination links, when present.
    pub last_page: Option<u32>,
}

/// Anything that can produce ranking pages.
///
/// The production implementation is [`Hiscores`]; tests drive the finder
/// with scripted ladders instead.
pub trait PageSource {
    fn fetch_page(
        &mut self,
        direction: Direction,
        skill: Skill,
        page: u32,
    ) -> Result<HiscoresPage, FetchError>;
}

/// HTTP client for the hiscores ranking endpoints.
pub struct Hiscores {
    rotator: ProxyRotator,
    agent: ureq::Agent,
    total_requests: u64,
    error_requests: u64,
}

impl Hiscores {
    pub fn new(rotator: ProxyRotator) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
        Self {
            rotator,
            agent,
            total_requests: 0,
            error_requests: 0,
        }
    }

    /// Requests issued, successful or not.
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Rate-limit (and structural-failure) events observed.
    pub fn error_requests(&self) -> u64 {
        self.error_requests
    }

    /// Current per-proxy cool-down of the underlying rotator.
    pub fn delay(&self) -> Duration {
        self.rotator.delay()
    }

    fn request(&self, proxy: &Proxy, target: &str) -> Result<String, FetchError> {
        let request = match proxy {
            Proxy::Direct => self.agent.get(target),
            Proxy::Via(url) => self.agent.get(url).query("url", target),
        };

        let response = request
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|err| FetchError::Transport {
                message: err.to_string(),
            })?;

        response.into_string().map_err(|err| FetchError::Transport {
            message: err.to_string(),
        })
    }
}

impl PageSource for Hiscores {
    fn fetch_page(
        &mut self,
        direction: Direction,
        skill: Skill,
        page: u32,
    ) -> Result<HiscoresPage, FetchError> {
        let target = format!(
            "{}?category_type=0&table={}&page={}",
            direction.base_url(),
            skill.table_id(),
            page
        );

        for attempt in 1..=RETRY_LIMIT {
            let proxy = self.rotator.next();
            self.total_requests += 1;

            let body = match self.request(&proxy, &target) {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!(
                        url = %target,
                        proxy = %proxy,
                        attempt,
                        error = %err,
                        "transport failure, rotating proxy"
                    );
                    continue;
                }
            };

            match parse_ranking_page(&body) {
                Ok(parsed) => {
                    tracing::debug!(url = %target, proxy = %proxy, "request success");
                    return Ok(parsed);
                }
                Err(FetchError::RateLimited) | Err(FetchError::MissingTable) => {
                    self.error_requests += 1;
                    let delay = self.rotator.bump_delay();
                    tracing::warn!(
                        url = %target,
                        proxy = %proxy,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "rate limit signal, bumping delay and rotating proxy"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        Err(FetchError::Exhausted {
            attempts: RETRY_LIMIT,
        })
    }
}

/// Parse one ranking page body.
///
/// A page carrying an `#errorContent` element is the hiscores' rate-limit
/// response; a page with no ranking rows at all is treated the same way,
/// since both clear up on retry from another address.
pub fn parse_ranking_page(html: &str) -> Result<HiscoresPage, FetchError> {
    let document = Html::parse_document(html);

    let error_sel = Selector::parse("#errorContent").expect("static selector must parse");
    if document.select(&error_sel).next().is_some() {
        return Err(FetchError::RateLimited);
    }

    let row_sel = Selector::parse("div.tableWrap tbody tr").expect("static selector must parse");
    let mut rows = Vec::new();

    for tr in document.select(&row_sel) {
        // Whitespace between <td> elements parses as text nodes; walk only
        // the element children.
        let cells: Vec<ElementRef> = tr.children().filter_map(ElementRef::wrap).collect();

        if cells.len() < 4 {
            return Err(FetchError::Malformed {
                message: format!("expected 4 cells per row, found {}", cells.len()),
            });
        }

        let rank = parse_cell_number(&cells[0])?;
        let player = cell_text(&cells[1]);
        let level = parse_cell_number(&cells[2]).and_then(|n| {
            u32::try_from(n).map_err(|_| FetchError::Malformed {
                message: format!("level out of range: {n}"),
            })
        })?;
        let xp = parse_cell_number(&cells[3])?;

        rows.push(RankedRow {
            rank,
            player,
            level,
            xp,
        });
    }

    if rows.is_empty() {
        return Err(FetchError::MissingTable);
    }

    let page_sel = Selector::parse(".pageNumbers li a").expect("static selector must parse");
    let last_page = document
        .select(&page_sel)
        .last()
        .and_then(|a| cell_text(&a).replace(',', "").parse().ok());

    Ok(HiscoresPage { rows, last_page })
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Numbers arrive comma-grouped ("1,234,567"); nothing else is accepted.
fn parse_cell_number(cell: &ElementRef) -> Result<u64, FetchError> {
    let text = cell_text(cell);
    text.replace(',', "")
        .parse()
        .map_err(|_| FetchError::Malformed {
            message: format!("expected a number, found {text:?}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn ranking_row(rank: u64, player: &str, level: u32, xp: u64) -> String {
        format!(
            "<tr>\n  <td><a href=\"#\">{rank}</a></td>\n  <td><a href=\"#\">{player}</a></td>\n  \
             <td><a href=\"#\">{level}</a></td>\n  <td><a href=\"#\">{xp}</a></td>\n</tr>",
            rank = commas(rank),
            level = level,
            xp = commas(xp),
        )
    }

    fn commas(n: u64) -> String {
        let digits = n.to_string();
        let mut out = String::new();
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }

    fn ranking_page(rows: &[String], pages: &[u32]) -> String {
        let nav: String = pages
            .iter()
            .map(|p| format!("<li><a href=\"#\">{p}</a></li>"))
            .collect();
        format!(
            "<html><body>\n<div class=\"pageNumbers\"><ul>{nav}</ul></div>\n\
             <div class=\"tableWrap\">\n<table><tbody>\n{}\n</tbody></table>\n</div>\n\
             </body></html>",
            rows.join("\n"),
        )
    }

    #[test]
    fn parses_rows_with_grouped_numbers() {
        let rows = vec![
            ranking_row(1, "Zezima", 120, 104_772_129),
            ranking_row(2, "Player Two", 99, 13_100_000),
        ];
        let page = parse_ranking_page(&ranking_page(&rows, &[1, 2, 3])).unwrap();

        assert_eq!(page.rows.len(), 2);
        assert_eq!(
            page.rows[0],
            RankedRow {
                rank: 1,
                player: "Zezima".into(),
                level: 120,
                xp: 104_772_129,
            }
        );
        assert_eq!(page.rows[1].rank, 2);
        assert_eq!(page.rows[1].xp, 13_100_000);
    }

    #[test]
    fn last_page_comes_from_navigation() {
        let rows = vec![ranking_row(1, "A", 99, 14_000_000)];
        let page = parse_ranking_page(&ranking_page(&rows, &[1, 2, 3, 1042])).unwrap();
        assert_eq!(page.last_page, Some(1042));
    }

    #[test]
    fn missing_navigation_is_not_an_error() {
        let rows = vec![ranking_row(1, "A", 99, 14_000_000)];
        let page = parse_ranking_page(&ranking_page(&rows, &[])).unwrap();
        assert_eq!(page.last_page, None);
    }

    #[test]
    fn error_content_is_a_rate_limit() {
        let html = "<html><body><div id=\"errorContent\">\
                    <p>Sorry, something went wrong.</p></div></body></html>";
        assert!(matches!(parse_ranking_page(html), Err(FetchError::RateLimited)));
    }

    #[test]
    fn missing_table_is_structural() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(matches!(parse_ranking_page(html), Err(FetchError::MissingTable)));
    }

    #[test]
    fn short_row_is_malformed() {
        let html = "<html><body><div class=\"tableWrap\"><table><tbody>\
                    <tr><td><a>1</a></td><td><a>A</a></td></tr>\
                    </tbody></table></div></body></html>";
        assert!(matches!(
            parse_ranking_page(html),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn garbage_number_is_malformed() {
        let rows = vec![
            "<tr><td><a>1</a></td><td><a>A</a></td><td><a>99</a></td><td><a>3.2m</a></td></tr>"
                .to_string(),
        ];
        assert!(matches!(
            parse_ranking_page(&ranking_page(&rows, &[1])),
            Err(FetchError::Malformed { .. })
        ));
    }

    /// Serve each canned body to one connection, in order, then exit.
    fn spawn_server(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            for body in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body,
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        format!("http://{addr}/")
    }

    #[test]
    fn rate_limit_bumps_delay_and_rotates() {
        let err_body =
            "<html><body><div id=\"errorContent\"><p>slow down</p></div></body></html>";
        let ok_body = ranking_page(&[ranking_row(1, "A", 99, 14_000_000)], &[1]);
        let url = spawn_server(vec![err_body.to_string(), ok_body]);

        let rotator =
            ProxyRotator::new(vec![url.clone(), url], Duration::from_secs(12), Duration::ZERO);
        let mut hiscores = Hiscores::new(rotator);

        let page = hiscores.fetch_page(Direction::Main, Skill::Attack, 1).unwrap();

        assert_eq!(page.rows.len(), 1);
        assert_eq!(hiscores.total_requests(), 2);
        assert_eq!(hiscores.error_requests(), 1);
        assert_eq!(hiscores.delay(), Duration::from_secs(13));
    }

    #[test]
    fn transport_failure_rotates_to_the_next_proxy() {
        let ok_body = ranking_page(&[ranking_row(1, "A", 99, 14_000_000)], &[1]);
        let good = spawn_server(vec![ok_body]);
        // Nothing listens on the tcpmux port.
        let dead = "http://127.0.0.1:1/".to_string();

        let rotator = ProxyRotator::new(vec![dead, good], Duration::ZERO, Duration::ZERO);
        let mut hiscores = Hiscores::new(rotator);

        let page = hiscores.fetch_page(Direction::Main, Skill::Attack, 1).unwrap();

        assert_eq!(page.rows.len(), 1);
        assert_eq!(hiscores.total_requests(), 2);
        assert_eq!(hiscores.error_requests(), 0);
    }

    #[test]
    fn retry_budget_exhausts() {
        let rotator = ProxyRotator::new(
            vec!["http://127.0.0.1:1/".into()],
            Duration::ZERO,
            Duration::ZERO,
        );
        let mut hiscores = Hiscores::new(rotator);

        let err = hiscores.fetch_page(Direction::Main, Skill::Attack, 1).unwrap_err();

        assert!(matches!(err, FetchError::Exhausted { attempts: RETRY_LIMIT }));
        assert_eq!(hiscores.total_requests(), u64::from(RETRY_LIMIT));
    }
}
