//! Server-side HTML for the search page.

use crate::lookup::LookupState;
use crate::models::MovieDataWithTrailer;
use std::fmt::Write;

const MOCK_HINT: &str = "Available movies in mock: star wars, indiana jones, lord of the rings";

#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub mock: bool,
    /// Pre-filled value of the lag input; `None` hides the input.
    pub lag: Option<String>,
}

pub fn search_page(
    options: &PageOptions,
    query: &str,
    state: Option<&LookupState>,
    message: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str("<h1>Search Trailers");
    if options.mock {
        body.push_str(" (mock)");
    }
    body.push_str("</h1>\n");
    if options.mock {
        let _ = writeln!(body, "<p class=\"hint\">{}</p>", MOCK_HINT);
    }

    body.push_str("<form method=\"post\" action=\"/\">\n");
    if let Some(lag) = &options.lag {
        let _ = writeln!(
            body,
            "  <label>Simulate network lag in seconds: \
             <input type=\"text\" name=\"network_lag\" size=\"4\" value=\"{}\"></label>",
            escape_html(lag)
        );
    }
    let _ = writeln!(
        body,
        "  <input type=\"text\" name=\"title\" placeholder=\"Enter your search term\" \
         value=\"{}\">\n  <button type=\"submit\">Search</button>",
        escape_html(query)
    );
    body.push_str("</form>\n");

    if let Some(message) = message {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(message));
    }

    if let Some(state) = state {
        if state.error {
            let notice = state.notice.as_deref().unwrap_or("Error fetching data!");
            let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(notice));
        }
        if let Some(progress) = state.progress_line() {
            let _ = writeln!(body, "<p class=\"progress\">{}</p>", progress);
        }
        body.push_str("<section class=\"movies\">\n");
        for movie in state.displayable() {
            body.push_str(&movie_card(movie));
            body.push_str("<hr>\n");
        }
        body.push_str("</section>\n");
    }

    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Search Trailers</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

pub fn movie_card(movie: &MovieDataWithTrailer) -> String {
    let mut card = String::new();
    let _ = writeln!(
        card,
        "<article class=\"movie\" data-imdbid=\"{}\">",
        escape_html(&movie.imdbid)
    );
    if !movie.poster.is_empty() {
        let _ = writeln!(
            card,
            "  <img src=\"{}\" alt=\"{}\" width=\"150\" height=\"250\">",
            escape_html(&movie.poster),
            escape_html(&movie.title)
        );
    }
    let _ = writeln!(
        card,
        "  <h2>{} ({}) <small>{}</small></h2>",
        escape_html(&movie.title),
        escape_html(&movie.year),
        escape_html(&movie.rated)
    );
    for (label, value) in [
        ("Genre", &movie.genre),
        ("Director", &movie.director),
        ("Runtime", &movie.runtime),
        ("Released", &movie.released),
        ("IMDb Rating", &movie.imdbrating),
    ] {
        let _ = writeln!(card, "  <p><b>{}:</b> {}</p>", label, escape_html(value));
    }
    if !movie.plot.is_empty() {
        let _ = writeln!(card, "  <p class=\"plot\">{}</p>", escape_html(&movie.plot));
    }
    if let Some(embed) = movie.embed_link() {
        let _ = writeln!(
            card,
            "  <details><summary>Show Trailer</summary><iframe width=\"450\" height=\"280\" \
             src=\"{}\" title=\"YouTube video player\" allowfullscreen></iframe></details>",
            escape_html(&embed)
        );
    }
    if let Some(watch) = movie.watch_link() {
        let _ = writeln!(
            card,
            "  <p><a href=\"{}\">Watch on YouTube</a></p>",
            escape_html(&watch)
        );
    }
    card.push_str("</article>\n");
    card
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
