use std::io;
use std::io::Write;

use bytes::BytesMut;

use staxml::{Encoder, Error, Event, EventRead, PullParser, WriterOptions};

fn main() {
	let pretty = std::env::args().skip(1).any(|arg| arg == "--pretty");
	let stdin = io::BufReader::new(io::stdin());
	let mut stdout = io::stdout();
	let mut enc = Encoder::with_options(WriterOptions::default().pretty_print(pretty));
	let mut parser = PullParser::new(stdin);
	let mut buf = BytesMut::with_capacity(8192);
	let result = parser.read_all(|ev| {
		if pretty {
			if let Event::Characters(text) = &ev {
				if text.trim().is_empty() {
					return;
				}
			}
		}
		enc.encode_event(&ev, &mut buf)
			.expect("failed to encode xml");
		stdout
			.write_all(&buf[..])
			.expect("failed to write to stdout");
		buf.clear();
	});
	match result {
		Ok(()) => (),
		Err(Error::IO(e)) => panic!("I/O error: {}", e),
		Err(e) => panic!("invalid XML on input: {}", e),
	}
}
