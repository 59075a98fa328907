// XML sitemap output

use crate::error::{Result, SitemapError};
use chrono::Local;
use sitemaper_scanner::{FilterConfig, PageRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Crawl date in the `YYYY-MM-DD` form used by `<lastmod>`.
pub fn lastmod_today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Second filter pass, applied to full URLs when the sitemap is assembled.
///
/// Records containing an exclude pattern, or missing any must-include
/// pattern, are dropped. Which pages were visited is not affected.
pub fn filter_records<'a>(records: &'a [PageRecord], filters: &FilterConfig) -> Vec<&'a PageRecord> {
    records
        .iter()
        .filter(|record| filters.accepts(&record.url))
        .collect()
}

/// Streams `<url>` entries into any writer.
pub struct SitemapWriter<W: Write> {
    writer: W,
    lastmod: String,
    include_titles: bool,
    url_count: usize,
}

impl SitemapWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, lastmod: &str, include_titles: bool) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), lastmod, include_titles)
    }
}

impl<W: Write> SitemapWriter<W> {
    /// Write the XML declaration and open `<urlset>`.
    pub fn new(mut writer: W, lastmod: &str, include_titles: bool) -> std::io::Result<Self> {
        writeln!(writer, "<?xml version='1.0' encoding='UTF-8'?>")?;
        writeln!(writer, r#"<urlset xmlns="{}">"#, SITEMAP_NAMESPACE)?;

        Ok(Self {
            writer,
            lastmod: lastmod.to_string(),
            include_titles,
            url_count: 0,
        })
    }

    pub fn add_record(&mut self, record: &PageRecord) -> std::io::Result<()> {
        writeln!(self.writer, "  <url>")?;
        writeln!(self.writer, "    <loc>{}</loc>", escape_xml(&record.url))?;
        writeln!(self.writer, "    <lastmod>{}</lastmod>", escape_xml(&self.lastmod))?;
        if self.include_titles {
            writeln!(self.writer, "    <title>{}</title>", escape_xml(&record.title))?;
        }
        writeln!(self.writer, "  </url>")?;
        self.url_count += 1;
        Ok(())
    }

    /// Close `<urlset>`, flush, and return the writer with the entry count.
    pub fn finish(mut self) -> std::io::Result<(W, usize)> {
        writeln!(self.writer, "</urlset>")?;
        self.writer.flush()?;
        Ok((self.writer, self.url_count))
    }
}

fn output_error(path: &Path, source: std::io::Error) -> SitemapError {
    SitemapError::OutputError {
        path: path.display().to_string(),
        source,
    }
}

/// Create `path` and write the sitemap header.
pub fn open_sitemap(path: &Path, lastmod: &str, include_titles: bool) -> Result<SitemapWriter<BufWriter<File>>> {
    SitemapWriter::create(path, lastmod, include_titles).map_err(|e| output_error(path, e))
}

/// Append `records` to an opened sitemap and close it. Returns the number
/// of entries.
pub fn finish_sitemap<'a, W, I>(mut writer: SitemapWriter<W>, path: &Path, records: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a PageRecord>,
{
    for record in records {
        writer.add_record(record).map_err(|e| output_error(path, e))?;
    }
    let (_, count) = writer.finish().map_err(|e| output_error(path, e))?;
    Ok(count)
}

/// Write `records` to `path` as a sitemap. Returns the number of entries.
pub fn write_sitemap<'a, I>(path: &Path, records: I, lastmod: &str, include_titles: bool) -> Result<usize>
where
    I: IntoIterator<Item = &'a PageRecord>,
{
    let writer = open_sitemap(path, lastmod, include_titles)?;
    finish_sitemap(writer, path, records)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
