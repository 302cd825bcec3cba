use serde::{Deserialize, Serialize};

const WATCH_PREFIX: &str = "https://www.youtube.com/watch?v=";
const EMBED_PREFIX: &str = "https://www.youtube.com/embed/";

/// One row of the search phase. The API has shipped both the upstream
/// OMDb casing (`Title`, `imdbID`) and a lowercased one, so both decode.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CompactMovieData {
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(alias = "Year")]
    pub year: String,
    #[serde(alias = "imdbID", alias = "imdbId")]
    pub imdbid: String,
    #[serde(rename = "type", alias = "Type")]
    pub kind: String,
    #[serde(alias = "Poster")]
    pub poster: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MovieDataWithTrailer {
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(alias = "Year")]
    pub year: String,
    #[serde(alias = "Rated")]
    pub rated: String,
    #[serde(alias = "Released")]
    pub released: String,
    #[serde(alias = "Runtime")]
    pub runtime: String,
    #[serde(alias = "Genre")]
    pub genre: String,
    #[serde(alias = "Director")]
    pub director: String,
    #[serde(alias = "Plot")]
    pub plot: String,
    #[serde(alias = "Poster")]
    pub poster: String,
    #[serde(alias = "imdbRating")]
    pub imdbrating: String,
    #[serde(alias = "imdbID", alias = "imdbId")]
    pub imdbid: String,
    #[serde(rename = "trailerLink", alias = "trailer_link")]
    pub trailer_link: String,
    #[serde(rename = "trailerEmbedLink", alias = "trailer_embed_link")]
    pub trailer_embed_link: String,
}

impl MovieDataWithTrailer {
    /// A record is shown only when it has a title and some trailer reference.
    pub fn is_displayable(&self) -> bool {
        !self.title.trim().is_empty() && self.embed_link().is_some()
    }

    /// Embed URL for the trailer player, derived from the watch link when the
    /// API only sent that one.
    pub fn embed_link(&self) -> Option<String> {
        let embed = self.trailer_embed_link.trim();
        if !embed.is_empty() {
            return Some(embed.to_string());
        }
        let watch = self.trailer_link.trim();
        if watch.is_empty() {
            return None;
        }
        match youtube_video_id(watch) {
            Some(id) => Some(format!("{EMBED_PREFIX}{id}")),
            None => Some(watch.to_string()),
        }
    }

    pub fn watch_link(&self) -> Option<String> {
        let watch = self.trailer_link.trim();
        if !watch.is_empty() {
            return Some(watch.to_string());
        }
        self.trailer_embed_link
            .trim()
            .strip_prefix(EMBED_PREFIX)
            .filter(|id| !id.is_empty())
            .map(|id| format!("{WATCH_PREFIX}{id}"))
    }
}

fn youtube_video_id(link: &str) -> Option<&str> {
    let rest = link.strip_prefix(WATCH_PREFIX)?;
    let id = rest.split('&').next().unwrap_or(rest);
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
