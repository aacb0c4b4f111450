//! Response bodies for the search endpoint.

use serde_json::json;

use crate::search::SearchResults;

/// JSON body: `{"results": {...}, "query": "..."}`.
pub fn json_body(results: &SearchResults, query: &str) -> serde_json::Value {
    json!({ "results": results, "query": query })
}

/// XML document: one `<image>` per environment, one `<app>` per package,
/// record fields as attributes.
pub fn xml_body(results: &SearchResults, query: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("<results query=\"{}\">", escape(query)));
    for (identifier, packages) in results {
        out.push_str(&format!("<image name=\"{}\">", escape(identifier)));
        for record in packages.values() {
            out.push_str("<app");
            push_attribute(&mut out, "from", &record.source.to_string());
            push_attribute(&mut out, "name", &record.name);
            push_attribute(&mut out, "version", &record.version);
            if let Some(architecture) = &record.architecture {
                push_attribute(&mut out, "arch", architecture);
            }
            if let Some(state) = &record.state {
                push_attribute(&mut out, "state", state);
            }
            out.push_str(" />");
        }
        out.push_str("</image>");
    }
    out.push_str("</results>");
    out
}

/// HTML page with one results table per environment.
pub fn html_body(results: &SearchResults, query: &str) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>package search</title></head>\n<body>\n",
    );
    out.push_str(&format!("<h1>results for &quot;{}&quot;</h1>\n", escape(query)));
    if results.is_empty() {
        out.push_str("<p>no environment matched</p>\n");
    }
    for (identifier, packages) in results {
        out.push_str(&format!("<h2>{}</h2>\n", escape(identifier)));
        out.push_str("<table>\n<tr><th>name</th><th>version</th><th>from</th></tr>\n");
        for record in packages.values() {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&record.name),
                escape(&record.version),
                record.source
            ));
        }
        out.push_str("</table>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// Minimal escaping for text and attribute values.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{PackageRecord, SourceKind};
    use std::collections::BTreeMap;

    fn sample_results() -> SearchResults {
        let record = PackageRecord {
            name: "vim".to_string(),
            version: "2:8.1-1".to_string(),
            source: SourceKind::AptCache,
            architecture: Some("amd64".to_string()),
            state: Some("[installed]".to_string()),
        };
        let mut packages = BTreeMap::new();
        packages.insert(record.name.clone(), record);
        let mut results = SearchResults::new();
        results.insert("a.img".to_string(), packages);
        results
    }

    #[test]
    fn json_bodies_carry_results_and_query() {
        let body = json_body(&sample_results(), "vim");
        assert_eq!(body["query"], "vim");
        assert_eq!(body["results"]["a.img"]["vim"]["version"], "2:8.1-1");
        assert_eq!(body["results"]["a.img"]["vim"]["from"], "apt");
    }

    #[test]
    fn xml_bodies_nest_apps_inside_images() {
        let xml = xml_body(&sample_results(), "vim");
        assert_eq!(
            xml,
            "<results query=\"vim\"><image name=\"a.img\">\
             <app from=\"apt\" name=\"vim\" version=\"2:8.1-1\" arch=\"amd64\" \
             state=\"[installed]\" /></image></results>"
        );
    }

    #[test]
    fn xml_omits_absent_record_fields() {
        let record = PackageRecord {
            name: "requests".to_string(),
            version: "2.31.0".to_string(),
            source: SourceKind::PackageIndex,
            architecture: None,
            state: None,
        };
        let mut packages = BTreeMap::new();
        packages.insert(record.name.clone(), record);
        let mut results = SearchResults::new();
        results.insert("a.img".to_string(), packages);

        let xml = xml_body(&results, "requests");
        assert!(xml.contains("<app from=\"pip\" name=\"requests\" version=\"2.31.0\" />"));
        assert!(!xml.contains("arch="));
    }

    #[test]
    fn markup_in_values_is_escaped() {
        let xml = xml_body(&SearchResults::new(), "<script>\"&'");
        assert!(xml.contains("&lt;script&gt;&quot;&amp;&apos;"));
    }

    #[test]
    fn html_bodies_list_matches_per_environment() {
        let html = html_body(&sample_results(), "vim");
        assert!(html.contains("<h2>a.img</h2>"));
        assert!(html.contains("<td>vim</td>"));
        assert!(html.contains("<td>2:8.1-1</td>"));
    }

    #[test]
    fn html_reports_when_nothing_matched() {
        let html = html_body(&SearchResults::new(), "ghost");
        assert!(html.contains("no environment matched"));
    }
}
