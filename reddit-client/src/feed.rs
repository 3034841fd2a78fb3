//! Turns a feed document into [`Post`]s.
//!
//! Reddit serves Atom from `/new/.rss`; plain RSS 2.0 is accepted too so the
//! monitor can point at mirrors or proxies.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rss::Channel;
use subwatch_core::{FetchError, Post};
use tracing::debug;

pub fn parse_feed(subreddit: &str, document: &str) -> Result<Vec<Post>, FetchError> {
    let root = root_element(document).map_err(|details| invalid_feed(subreddit, details))?;

    match root.as_str() {
        "feed" => parse_atom(subreddit, document),
        "rss" => parse_rss(subreddit, document),
        other => Err(invalid_feed(
            subreddit,
            format!("unsupported root element <{}>", other),
        )),
    }
}

fn invalid_feed(subreddit: &str, details: impl Into<String>) -> FetchError {
    FetchError::InvalidFeed {
        subreddit: subreddit.to_string(),
        details: details.into(),
    }
}

fn root_element(document: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(document);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) => return Err("document has no root element".to_string()),
            Ok(_) => continue,
            Err(e) => return Err(e.to_string()),
        }
    }
}

fn parse_rss(subreddit: &str, document: &str) -> Result<Vec<Post>, FetchError> {
    let channel =
        Channel::read_from(document.as_bytes()).map_err(|e| invalid_feed(subreddit, e.to_string()))?;

    Ok(channel
        .items()
        .iter()
        .filter_map(|item| {
            let link = item.link().map(str::trim).filter(|l| !l.is_empty());
            let guid = item.guid().map(|g| g.value().trim()).filter(|g| !g.is_empty());
            let Some(id) = link.or(guid) else {
                debug!("Skipping r/{} item without link or guid", subreddit);
                return None;
            };

            Some(Post {
                id: id.to_string(),
                subreddit: subreddit.to_string(),
                title: item.title().unwrap_or_default().trim().to_string(),
                body: item
                    .description()
                    .or_else(|| item.content())
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                link: link.unwrap_or(id).to_string(),
            })
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomField {
    Id,
    Title,
    Content,
    Summary,
}

impl AtomField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Self::Id),
            b"title" => Some(Self::Title),
            b"content" => Some(Self::Content),
            b"summary" => Some(Self::Summary),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct AtomEntry {
    id: String,
    title: String,
    link: Option<String>,
    content: String,
    summary: String,
}

impl AtomEntry {
    fn push_text(&mut self, field: AtomField, text: &str) {
        match field {
            AtomField::Id => self.id.push_str(text),
            AtomField::Title => self.title.push_str(text),
            AtomField::Content => self.content.push_str(text),
            AtomField::Summary => self.summary.push_str(text),
        }
    }

    fn take_link(&mut self, element: &BytesStart) {
        if self.link.is_some() {
            return;
        }
        let rel = attribute(element, "rel");
        if matches!(rel.as_deref(), None | Some("alternate")) {
            self.link = attribute(element, "href").filter(|href| !href.trim().is_empty());
        }
    }

    fn into_post(self, subreddit: &str) -> Option<Post> {
        let link = self.link.map(|l| l.trim().to_string());
        let id = self.id.trim();
        let key = match &link {
            Some(link) => link.clone(),
            None if !id.is_empty() => id.to_string(),
            None => return None,
        };

        let body = if self.content.trim().is_empty() {
            self.summary
        } else {
            self.content
        };

        Some(Post {
            link: link.unwrap_or_else(|| key.clone()),
            id: key,
            subreddit: subreddit.to_string(),
            title: self.title.trim().to_string(),
            body: body.trim().to_string(),
        })
    }
}

fn attribute(element: &BytesStart, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

fn parse_atom(subreddit: &str, document: &str) -> Result<Vec<Post>, FetchError> {
    let mut reader = Reader::from_str(document);
    let mut posts = Vec::new();
    let mut entry: Option<AtomEntry> = None;
    // Field currently collecting text. Markup nested inside it (xhtml content)
    // contributes its text but does not close the field.
    let mut field: Option<AtomField> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| invalid_feed(subreddit, e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = e.local_name();
                if entry.is_none() {
                    if name.as_ref() == b"entry" {
                        entry = Some(AtomEntry::default());
                    }
                } else if field.is_none() {
                    if name.as_ref() == b"link" {
                        if let Some(current) = entry.as_mut() {
                            current.take_link(&e);
                        }
                    } else {
                        field = AtomField::from_name(name.as_ref());
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(current) = entry.as_mut() {
                    if field.is_none() && e.local_name().as_ref() == b"link" {
                        current.take_link(&e);
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(current), Some(active)) = (entry.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| invalid_feed(subreddit, e.to_string()))?;
                    current.push_text(active, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(current), Some(active)) = (entry.as_mut(), field) {
                    current.push_text(active, &String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if field.is_some() && AtomField::from_name(name.as_ref()) == field {
                    field = None;
                } else if field.is_none() && name.as_ref() == b"entry" {
                    if let Some(finished) = entry.take() {
                        match finished.into_post(subreddit) {
                            Some(post) => posts.push(post),
                            None => debug!("Skipping r/{} entry without link or id", subreddit),
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(posts)
}
