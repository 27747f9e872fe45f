//! Torznab XML documents: result feeds, caps, indexer lists and errors.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;
use trawl_core::{CapabilityEntry, CapsCategory, ReleaseInfo, TorznabCaps};

pub const TORZNAB_NS: &str = "http://torznab.com/schemas/2015/feed";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const TORRENT_MIME: &str = "application/x-bittorrent";

/// Standard Torznab error codes.
pub mod codes {
    pub const BAD_CREDENTIALS: u16 = 100;
    pub const MISSING_PARAMETER: u16 = 200;
    pub const INCORRECT_PARAMETER: u16 = 201;
    pub const NO_SUCH_FUNCTION: u16 = 203;
    pub const UNKNOWN_ERROR: u16 = 900;
}

#[derive(Debug, Error)]
#[error("Failed to write XML: {0}")]
pub struct XmlError(String);

type XmlWriter = Writer<Vec<u8>>;

/// Channel header of a result feed.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub self_link: String,
}

/// Render a search result feed.
pub fn render_results(channel: &ChannelInfo, releases: &[ReleaseInfo]) -> Result<String, XmlError> {
    let mut w = new_writer()?;

    let rss = BytesStart::new("rss").with_attributes([
        ("version", "2.0"),
        ("xmlns:atom", ATOM_NS),
        ("xmlns:torznab", TORZNAB_NS),
    ]);
    emit(&mut w, Event::Start(rss))?;
    emit(&mut w, Event::Start(BytesStart::new("channel")))?;

    emit(
        &mut w,
        Event::Empty(BytesStart::new("atom:link").with_attributes([
            ("href", channel.self_link.as_str()),
            ("rel", "self"),
            ("type", "application/rss+xml"),
        ])),
    )?;
    text_element(&mut w, "title", &channel.title)?;
    text_element(&mut w, "description", &channel.description)?;
    text_element(&mut w, "link", &channel.link)?;
    text_element(&mut w, "language", &channel.language)?;
    text_element(&mut w, "category", "search")?;

    for release in releases {
        write_item(&mut w, release)?;
    }

    emit(&mut w, Event::End(BytesEnd::new("channel")))?;
    emit(&mut w, Event::End(BytesEnd::new("rss")))?;
    finish(w)
}

fn write_item(w: &mut XmlWriter, release: &ReleaseInfo) -> Result<(), XmlError> {
    emit(w, Event::Start(BytesStart::new("item")))?;

    text_element(w, "title", &release.title)?;
    let guid = release
        .details_url
        .as_deref()
        .or(release.download_url())
        .unwrap_or(&release.title);
    text_element(w, "guid", guid)?;

    emit(
        w,
        Event::Start(
            BytesStart::new("jackettindexer").with_attributes([("id", release.source_id.as_str())]),
        ),
    )?;
    emit(w, Event::Text(BytesText::new(&release.source_name)))?;
    emit(w, Event::End(BytesEnd::new("jackettindexer")))?;

    if let Some(details) = &release.details_url {
        text_element(w, "comments", details)?;
    }
    if let Some(date) = release.publish_date {
        text_element(w, "pubDate", &date.to_rfc2822())?;
    }
    if let Some(size) = release.size_bytes {
        text_element(w, "size", &size.to_string())?;
    }
    if let Some(files) = release.files {
        text_element(w, "files", &files.to_string())?;
    }
    if let Some(grabs) = release.grabs {
        text_element(w, "grabs", &grabs.to_string())?;
    }
    if let Some(url) = release.download_url() {
        text_element(w, "link", url)?;
    }
    for category in &release.categories {
        text_element(w, "category", &category.to_string())?;
    }
    if let Some(url) = release.download_url() {
        let length = release.size_bytes.unwrap_or(0).to_string();
        emit(
            w,
            Event::Empty(BytesStart::new("enclosure").with_attributes([
                ("url", url),
                ("length", length.as_str()),
                ("type", TORRENT_MIME),
            ])),
        )?;
    }

    for category in &release.categories {
        torznab_attr(w, "category", &category.to_string())?;
    }
    if let Some(seeders) = release.seeders {
        torznab_attr(w, "seeders", &seeders.to_string())?;
    }
    if let Some(peers) = release.peers {
        torznab_attr(w, "peers", &peers.to_string())?;
    }
    if let Some(grabs) = release.grabs {
        torznab_attr(w, "grabs", &grabs.to_string())?;
    }
    if let Some(files) = release.files {
        torznab_attr(w, "files", &files.to_string())?;
    }
    if let Some(imdb) = &release.imdb_id {
        torznab_attr(w, "imdbid", imdb.trim_start_matches("tt"))?;
    }
    if let Some(hash) = &release.info_hash {
        torznab_attr(w, "infohash", hash)?;
    }
    if let Some(magnet) = &release.magnet_uri {
        torznab_attr(w, "magneturl", magnet)?;
    }

    emit(w, Event::End(BytesEnd::new("item")))
}

/// Render a caps document.
pub fn render_caps(caps: &TorznabCaps, server_title: &str) -> Result<String, XmlError> {
    let mut w = new_writer()?;
    emit(&mut w, Event::Start(BytesStart::new("caps")))?;
    write_caps_body(&mut w, caps, Some(server_title))?;
    emit(&mut w, Event::End(BytesEnd::new("caps")))?;
    finish(w)
}

fn write_caps_body(
    w: &mut XmlWriter,
    caps: &TorznabCaps,
    server_title: Option<&str>,
) -> Result<(), XmlError> {
    if let Some(title) = server_title {
        emit(
            w,
            Event::Empty(BytesStart::new("server").with_attributes([("title", title)])),
        )?;
    }

    let default = caps.limit_default.to_string();
    let max = caps.limit_max.to_string();
    emit(
        w,
        Event::Empty(BytesStart::new("limits").with_attributes([
            ("default", default.as_str()),
            ("max", max.as_str()),
        ])),
    )?;

    emit(w, Event::Start(BytesStart::new("searching")))?;
    for mode in &caps.searching {
        let params = mode.supported_params.join(",");
        emit(
            w,
            Event::Empty(BytesStart::new(mode.mode.caps_element()).with_attributes([
                ("available", if mode.available { "yes" } else { "no" }),
                ("supportedParams", params.as_str()),
            ])),
        )?;
    }
    emit(w, Event::End(BytesEnd::new("searching")))?;

    emit(w, Event::Start(BytesStart::new("categories")))?;
    for category in &caps.categories {
        write_caps_category(w, category, "category")?;
    }
    emit(w, Event::End(BytesEnd::new("categories")))
}

fn write_caps_category(
    w: &mut XmlWriter,
    category: &CapsCategory,
    element: &'static str,
) -> Result<(), XmlError> {
    let id = category.id.to_string();
    let start = BytesStart::new(element)
        .with_attributes([("id", id.as_str()), ("name", category.name.as_str())]);
    if category.subcats.is_empty() {
        return emit(w, Event::Empty(start));
    }
    emit(w, Event::Start(start))?;
    for sub in &category.subcats {
        write_caps_category(w, sub, "subcat")?;
    }
    emit(w, Event::End(BytesEnd::new(element)))
}

/// Render the `t=indexers` listing.
pub fn render_indexers(entries: &[CapabilityEntry]) -> Result<String, XmlError> {
    let mut w = new_writer()?;
    emit(&mut w, Event::Start(BytesStart::new("indexers")))?;

    for entry in entries {
        let start = BytesStart::new("indexer").with_attributes([
            ("id", entry.id.as_str()),
            ("configured", if entry.configured { "true" } else { "false" }),
        ]);
        emit(&mut w, Event::Start(start))?;
        text_element(&mut w, "title", &entry.name)?;
        text_element(&mut w, "description", entry.description.as_deref().unwrap_or(""))?;
        text_element(&mut w, "link", entry.link.as_deref().unwrap_or(""))?;
        text_element(&mut w, "language", &entry.language)?;
        text_element(&mut w, "type", entry.kind.as_str())?;
        text_element(&mut w, "status", entry.status.as_str())?;
        text_element(&mut w, "lasttest", entry.last_test_result.as_str())?;
        if let Some(error) = &entry.last_error {
            text_element(&mut w, "lasterror", error)?;
        }
        emit(&mut w, Event::Start(BytesStart::new("caps")))?;
        write_caps_body(&mut w, &entry.caps, None)?;
        emit(&mut w, Event::End(BytesEnd::new("caps")))?;
        emit(&mut w, Event::End(BytesEnd::new("indexer")))?;
    }

    emit(&mut w, Event::End(BytesEnd::new("indexers")))?;
    finish(w)
}

/// Render a Torznab error document.
pub fn render_error(code: u16, description: &str) -> String {
    let build = || -> Result<String, XmlError> {
        let mut w = new_writer()?;
        let code = code.to_string();
        emit(
            &mut w,
            Event::Empty(BytesStart::new("error").with_attributes([
                ("code", code.as_str()),
                ("description", description),
            ])),
        )?;
        finish(w)
    };
    build().unwrap_or_else(|_| {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<error code=\"{}\" description=\"Unknown error\"/>",
            code
        )
    })
}

fn new_writer() -> Result<XmlWriter, XmlError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(w)
}

fn finish(w: XmlWriter) -> Result<String, XmlError> {
    String::from_utf8(w.into_inner()).map_err(|e| XmlError(e.to_string()))
}

fn emit(w: &mut XmlWriter, event: Event<'_>) -> Result<(), XmlError> {
    w.write_event(event).map_err(|e| XmlError(e.to_string()))
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> Result<(), XmlError> {
    emit(w, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        emit(w, Event::Text(BytesText::new(text)))?;
    }
    emit(w, Event::End(BytesEnd::new(name)))
}

fn torznab_attr(w: &mut XmlWriter, name: &str, value: &str) -> Result<(), XmlError> {
    emit(
        w,
        Event::Empty(
            BytesStart::new("torznab:attr").with_attributes([("name", name), ("value", value)]),
        ),
    )
}
