use super::story_input::OutputFormat;

/// Upper-cases the first character of a word.
pub fn capitalize(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}

/// Removes the space the tokenizer inserted before `. , ! ; :`,
/// restoring natural punctuation spacing.
pub fn unspace_punctuation(text: &str) -> String {
	let mut out = text.to_owned();
	for mark in [" .", " ,", " !", " ;", " :"] {
		out = out.replace(mark, &mark[1..]);
	}
	out
}

/// Entity-escapes the characters HTML treats specially.
fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}

/// Restores punctuation spacing in every paragraph and re-encodes it
/// for the requested output format. HTML paragraphs are entity-escaped
/// and wrapped in a paragraph element.
pub fn format_paragraphs(paragraphs: &[String], format: OutputFormat) -> Vec<String> {
	paragraphs
		.iter()
		.map(|paragraph| {
			let unspaced = unspace_punctuation(paragraph);
			match format {
				OutputFormat::Plaintext => unspaced,
				OutputFormat::Html => format!("<p>{}</p>", escape(&unspaced)),
			}
		})
		.collect()
}

/// Joins formatted paragraphs into the final story: blank-line
/// separated plaintext, or a complete HTML document with head, body
/// and title boilerplate.
pub fn assemble_story(paragraphs: &[String], format: OutputFormat) -> String {
	let formatted = format_paragraphs(paragraphs, format);
	match format {
		OutputFormat::Plaintext => formatted.join("\n\n"),
		OutputFormat::Html => format!(
			"<!DOCTYPE html>\n<html>\n<head>\n<title>Generated story</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
			formatted.join("\n")
		),
	}
}
