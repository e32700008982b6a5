use super::*;

use std::io;

use bytes::BytesMut;

// note that these are end-to-end scenarios... the components are tested
// extensively in their modules.

const DOC: &'static [u8] = b"<?xml version='1.0'?>\n<root xmlns='urn:uuid:fab98e86-7c09-477c-889c-0313d9877bb4' a=\"foo\" b='bar'><child>with some text &amp; an entity</child><!-- skipped --><empty/><![CDATA[<raw>]]></root>";

fn parse_chunked(doc: &[u8], chunk_size: usize) -> Vec<Event> {
	let mut fp = FeedParser::new();
	let mut out = Vec::new();
	for chunk in doc.chunks(chunk_size) {
		fp.feed(chunk);
		assert!(!fp.read_all_eof(|ev| out.push(ev)).unwrap());
	}
	fp.feed_eof();
	assert!(fp.read_all_eof(|ev| out.push(ev)).unwrap());
	out
}

fn parse_all(doc: &[u8]) -> Vec<Event> {
	parse_chunked(doc, doc.len().max(1))
}

fn parse_result(doc: &[u8]) -> Result<Vec<Event>> {
	let mut fp = FeedParser::new();
	let mut out = Vec::new();
	fp.feed(doc);
	fp.feed_eof();
	fp.read_all(|ev| out.push(ev))?;
	Ok(out)
}

fn write_events(events: &[Event], opts: WriterOptions) -> String {
	let mut enc = Encoder::with_options(opts);
	let mut buf = BytesMut::new();
	for ev in events {
		enc.encode_event(ev, &mut buf).unwrap();
	}
	String::from_utf8(buf.to_vec()).unwrap()
}

#[test]
fn feedparser_can_read_xml_document() {
	let mut fp = FeedParser::new();
	let mut out = Vec::<Event>::new();
	fp.feed(DOC);
	let result = fp.read_all_eof(|ev| {
		out.push(ev);
	});
	assert_eq!(result.unwrap(), false);

	{
		let mut iter = out.iter();
		assert_eq!(*iter.next().unwrap(), Event::StartDocument);
		assert_eq!(*iter.next().unwrap(), Event::Characters("\n".to_string()));
		match iter.next().unwrap() {
			Event::StartElement(el) => {
				assert_eq!(
					el.name.uri.as_deref(),
					Some("urn:uuid:fab98e86-7c09-477c-889c-0313d9877bb4")
				);
				assert_eq!(el.name.local_name.as_str(), "root");
				assert_eq!(el.attributes.len(), 3);
				assert_eq!(el.attributes["a"], "foo");
				assert_eq!(el.attributes["b"], "bar");
				// the default namespace does not apply to attributes
				assert_eq!(el.attributes_with_prefix["a"].uri, None);
			}
			other => panic!("unexpected event: {:?}", other),
		};
		match iter.next().unwrap() {
			Event::StartElement(el) => {
				assert_eq!(
					el.name.uri.as_deref(),
					Some("urn:uuid:fab98e86-7c09-477c-889c-0313d9877bb4")
				);
				assert_eq!(el.name.local_name.as_str(), "child");
				assert_eq!(el.attributes.len(), 0);
			}
			other => panic!("unexpected event: {:?}", other),
		};
		assert_eq!(
			*iter.next().unwrap(),
			Event::Characters("with some text & an entity".to_string())
		);
		match iter.next().unwrap() {
			Event::EndElement(name) => assert_eq!(name.local_name.as_str(), "child"),
			other => panic!("unexpected event: {:?}", other),
		};
		match iter.next().unwrap() {
			Event::StartElement(el) => assert_eq!(el.name.local_name.as_str(), "empty"),
			other => panic!("unexpected event: {:?}", other),
		};
		match iter.next().unwrap() {
			Event::EndElement(name) => assert_eq!(name.local_name.as_str(), "empty"),
			other => panic!("unexpected event: {:?}", other),
		};
		assert_eq!(*iter.next().unwrap(), Event::CData("<raw>".to_string()));
		match iter.next().unwrap() {
			Event::EndElement(name) => assert_eq!(name.local_name.as_str(), "root"),
			other => panic!("unexpected event: {:?}", other),
		};
		assert!(iter.next().is_none());
	}

	fp.feed_eof();
	let result = fp.read_all_eof(|ev| assert_eq!(ev, Event::EndDocument));
	assert_eq!(result.unwrap(), true);
	assert_eq!(fp.read().unwrap(), None);
}

#[test]
fn feedparser_can_handle_chunked_input() {
	let reference = parse_all(DOC);
	for chunk_size in &[1usize, 5, 20] {
		assert_eq!(
			parse_chunked(DOC, *chunk_size),
			reference,
			"chunk size {}",
			chunk_size
		);
	}
}

#[test]
fn pullparser_can_read_xml_document() {
	let mut src = DOC;
	let mut pp = PullParser::new(&mut src);
	let mut out = Vec::new();
	assert_eq!(pp.read_all_eof(|ev| out.push(ev)).unwrap(), true);
	assert_eq!(out, parse_all(DOC));
	assert!(pp.get_inner().is_none());
}

#[test]
fn tags_are_balanced() {
	let events = parse_chunked(DOC, 3);
	let mut stack = Vec::new();
	for ev in events.iter() {
		match ev {
			Event::StartElement(el) => stack.push(el.name.clone()),
			Event::EndElement(name) => assert_eq!(stack.pop().as_ref(), Some(name)),
			_ => (),
		}
	}
	assert!(stack.is_empty());
	let starts = events
		.iter()
		.filter(|ev| matches!(ev, Event::StartElement(_)))
		.count();
	let ends = events
		.iter()
		.filter(|ev| matches!(ev, Event::EndElement(_)))
		.count();
	assert_eq!(starts, ends);
}

#[test]
fn prefixed_element_resolves_namespace() {
	let events = parse_all(b"<root xmlns:h=\"U1\"><h:a/></root>");
	match &events[2] {
		Event::StartElement(el) => {
			assert_eq!(el.name.name.as_str(), "h:a");
			assert_eq!(el.name.local_name.as_str(), "a");
			assert_eq!(el.name.prefix.as_deref(), Some("h"));
			assert_eq!(el.name.uri.as_deref(), Some("U1"));
		}
		other => panic!("unexpected event: {:?}", other),
	}
	match &events[1] {
		Event::StartElement(el) => assert_eq!(el.name.uri, None),
		other => panic!("unexpected event: {:?}", other),
	}
}

#[test]
fn mismatched_tag_names_both_elements() {
	let err = parse_result(b"<a><b></a>").unwrap_err();
	match &err {
		Error::Structural(StructuralError::MismatchedTag { expected, found }) => {
			assert_eq!(expected, "b");
			assert_eq!(found, "a");
		}
		other => panic!("unexpected error: {:?}", other),
	}
	let msg = err.to_string();
	assert!(msg.contains("</a>") && msg.contains("</b>"), "{}", msg);
}

#[test]
fn unclosed_elements_fail_at_end_of_document() {
	let err = parse_result(b"<a><b>").unwrap_err();
	assert_eq!(
		err,
		Error::Structural(StructuralError::UnclosedElements(vec![
			"a".to_string(),
			"b".to_string()
		]))
	);
	assert!(err.to_string().contains("unexpected end of document"));
}

#[test]
fn error_is_reported_once_as_event() {
	let mut fp = FeedParser::new();
	fp.feed(&b"<a></b>trailing"[..]);
	let mut events = Vec::new();
	loop {
		match fp.read() {
			Ok(Some(ev)) => events.push(ev),
			Ok(None) => break,
			Err(e) => panic!("unexpected error: {:?}", e),
		}
	}
	assert_eq!(events.len(), 3);
	assert!(matches!(
		events[2],
		Event::Error(Error::Structural(StructuralError::MismatchedTag { .. }))
	));
	// further input is ignored
	fp.feed(&b"<c/>"[..]);
	assert_eq!(fp.read().unwrap(), None);
}

#[test]
fn attribute_before_element_is_a_state_error() {
	let mut enc = Encoder::new();
	let mut buf = BytesMut::new();
	assert_eq!(
		enc.attribute("x", "1", None, &mut buf).unwrap_err(),
		Error::State(StateError::AttributeNotAllowed)
	);
	assert!(buf.is_empty());
}

#[test]
fn self_closing_is_start_and_end() {
	let events = parse_chunked(b"<br/>", 1);
	assert_eq!(events.len(), 4);
	assert!(matches!(&events[1], Event::StartElement(el) if el.name.name.as_str() == "br"));
	assert!(matches!(&events[2], Event::EndElement(name) if name.name.as_str() == "br"));

	let mut enc = Encoder::new();
	let mut buf = BytesMut::new();
	enc.start_element("br", ElementOptions::default().self_closing(true), &mut buf)
		.unwrap();
	assert_eq!(enc.depth(), 0);
	enc.end_document(&mut buf).unwrap();
	assert_eq!(&buf[..], b"<br/>");
}

#[test]
fn multibyte_character_split_across_chunks() {
	let doc = "<p>café</p>".as_bytes();
	// the split falls between the two bytes of "é"
	let split = doc.iter().position(|b| *b == 0xc3).unwrap() + 1;
	let mut fp = FeedParser::new();
	let mut out = Vec::new();
	fp.feed(&doc[..split]);
	assert!(!fp.read_all_eof(|ev| out.push(ev)).unwrap());
	fp.feed(&doc[split..]);
	fp.feed_eof();
	assert!(fp.read_all_eof(|ev| out.push(ev)).unwrap());
	assert_eq!(out[2], Event::Characters("café".to_string()));
}

#[test]
fn writer_output_round_trips() {
	let mut enc = Encoder::new();
	let mut buf = BytesMut::new();
	enc.start_document("1.0", None, &mut buf).unwrap();
	// replayed attributes come out sorted by name
	enc.start_element(
		"feed",
		ElementOptions::default()
			.uri("urn:feed")
			.attribute("zone", "utc"),
		&mut buf,
	)
	.unwrap();
	enc.start_element(
		"entry",
		ElementOptions::default().prefix("z").uri("urn:meta"),
		&mut buf,
	)
	.unwrap();
	enc.attribute("id", "1 & 2", Some("z"), &mut buf).unwrap();
	enc.characters("a < b", &mut buf).unwrap();
	enc.end_element(&mut buf).unwrap();
	enc.cdata("x]y", &mut buf).unwrap();
	enc.start_element("empty", ElementOptions::default(), &mut buf)
		.unwrap();
	enc.end_document(&mut buf).unwrap();
	let written = String::from_utf8(buf.to_vec()).unwrap();
	assert_eq!(
		written,
		concat!(
			"<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
			"<feed xmlns=\"urn:feed\" zone=\"utc\">",
			"<z:entry xmlns:z=\"urn:meta\" z:id=\"1 &amp; 2\">a &lt; b</z:entry>",
			"<![CDATA[x]y]]><empty/></feed>"
		)
	);

	let replayed = write_events(&parse_all(written.as_bytes()), WriterOptions::default());
	assert_eq!(replayed, written);
}

#[test]
fn pretty_output_round_trips() {
	let events = parse_all(b"<a><b>text</b><c><d/></c></a>");
	let opts = || WriterOptions::default().pretty_print(true).indent("\t");
	let written = write_events(&events, opts());
	assert_eq!(
		written,
		concat!(
			"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
			"<a>\n",
			"\t<b>text</b>\n",
			"\t<c>\n",
			"\t\t<d/>\n",
			"\t</c>\n",
			"</a>"
		)
	);

	let reparsed: Vec<Event> = parse_all(written.as_bytes())
		.into_iter()
		.filter(|ev| match ev {
			Event::Characters(text) => !text.trim().is_empty(),
			_ => true,
		})
		.collect();
	assert_eq!(write_events(&reparsed, opts()), written);
}

#[test]
fn source_failure_terminates_pullparser() {
	struct Failing(bool);

	impl io::Read for Failing {
		fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
			if self.0 {
				return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
			}
			self.0 = true;
			let data = b"<a>";
			buf[..data.len()].copy_from_slice(data);
			Ok(data.len())
		}
	}

	let mut pp = PullParser::new(io::BufReader::new(Failing(false)));
	let err = pp.read_all(|_| ()).unwrap_err();
	assert!(matches!(err, Error::IO(e) if e.kind() == io::ErrorKind::ConnectionReset));
	assert!(pp.get_inner().is_none());
	assert_eq!(pp.read().unwrap(), None);
}

#[test]
fn unsupported_decoder_fails_immediately() {
	let mut fp = FeedParser::with_options(ParserOptions::default().decoder("latin1"));
	fp.feed(&b"<a/>"[..]);
	fp.feed_eof();
	assert_eq!(
		fp.read().unwrap(),
		Some(Event::Error(Error::Encoding(EncodingError::UnsupportedEncoding(
			"latin1".to_string()
		))))
	);
	assert_eq!(fp.read().unwrap(), None);
}
