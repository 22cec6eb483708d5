use std::fmt;
use std::io::Write;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::error::Error;
use crate::Iter;

static DEPTH: AtomicUsize = AtomicUsize::new(0);

pub(super) fn traced<T, A>(name: String, iter: Iter<T, A>, count: usize) -> Iter<T, A>
where
    T: StreamData + fmt::Debug,
    A: Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c: Chunk<T>| {
            let depth = DEPTH.fetch_add(1, Ordering::SeqCst);
            start(depth, &name, count, &c);
            let next = Iter::NeedInput(f).step(c);
            end(depth, &name, count, &severity(&next));
            DEPTH.fetch_sub(1, Ordering::SeqCst);
            traced(name, next, count + 1)
        })),
        Iter::Ctl(req, k) => {
            let depth = DEPTH.load(Ordering::SeqCst);
            line(depth, &name, &format!("ctl {}", req.name()), dim());
            Iter::Ctl(req, Box::new(move |r| traced(name, k(r), count)))
        }
        terminal => terminal,
    }
}

pub(super) fn report(err: &Error) {
    let style = anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Red.into()));
    let writer = anstream::stderr();
    let mut writer = writer.lock();
    let _ = writeln!(
        writer,
        "{}{}: {err}{}",
        style.render(),
        super::progname(),
        style.render_reset(),
    );
}

struct Severity {
    label: String,
    style: anstyle::Style,
}

fn severity<T, A>(state: &Iter<T, A>) -> Severity
where
    T: StreamData,
{
    let (label, color) = match state {
        Iter::NeedInput(_) => ("need-input", anstyle::AnsiColor::Cyan),
        Iter::Ctl(req, _) => return Severity {
            label: format!("ctl {}", req.name()),
            style: dim(),
        },
        Iter::Done(..) => ("done", anstyle::AnsiColor::Green),
        Iter::IterFail(_) => ("iter-fail", anstyle::AnsiColor::Yellow),
        Iter::EnumOFail(..) => ("enum-o-fail", anstyle::AnsiColor::Red),
        Iter::EnumIFail(..) => ("enum-i-fail", anstyle::AnsiColor::Red),
    };
    Severity {
        label: label.to_owned(),
        style: anstyle::Style::new().fg_color(Some(color.into())),
    }
}

fn dim() -> anstyle::Style {
    anstyle::Style::new().dimmed()
}

fn start<T>(depth: usize, name: &str, count: usize, chunk: &Chunk<T>)
where
    T: StreamData + fmt::Debug,
{
    let gutter_style = anstyle::Style::new().bold();
    let input_style = anstyle::Style::new().underline();
    let eof_style = anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Cyan.into()));

    let (call_width, input_width) = column_widths();

    let count = if 0 < count {
        format!(":{count}")
    } else {
        String::new()
    };
    let call_column = format!("{:depth$}> {name}{count}", "");

    let mut debug_data = format!("{:?}", chunk.data());
    if let Some(offset) = debug_data
        .char_indices()
        .enumerate()
        .find_map(|(pos, (offset, _))| (input_width <= pos).then_some(offset))
    {
        debug_data.truncate(offset);
    }
    let eof = if chunk.is_eof() { "∅" } else { "" };

    let writer = anstream::stderr();
    let mut writer = writer.lock();
    let _ = writeln!(
        writer,
        "{call_column:call_width$} {gutter_style}|{gutter_reset} {input_style}{debug_data}{input_reset}{eof_style}{eof}{eof_reset}",
        gutter_style = gutter_style.render(),
        gutter_reset = gutter_style.render_reset(),
        input_style = input_style.render(),
        input_reset = input_style.render_reset(),
        eof_style = eof_style.render(),
        eof_reset = eof_style.render_reset(),
    );
}

fn end(depth: usize, name: &str, count: usize, severity: &Severity) {
    let count = if 0 < count {
        format!(":{count}")
    } else {
        String::new()
    };
    line(depth, &format!("{name}{count}"), &severity.label, severity.style);
}

fn line(depth: usize, name: &str, status: &str, status_style: anstyle::Style) {
    let gutter_style = anstyle::Style::new().bold();
    let (call_width, _) = column_widths();
    let call_column = format!("{:depth$}< {name}", "");

    let writer = anstream::stderr();
    let mut writer = writer.lock();
    let _ = writeln!(
        writer,
        "{status_style}{call_column:call_width$}{status_reset} {gutter_style}|{gutter_reset} {status_style}{status}{status_reset}",
        gutter_style = gutter_style.render(),
        gutter_reset = gutter_style.render_reset(),
        status_style = status_style.render(),
        status_reset = status_style.render_reset(),
    );
}

fn column_widths() -> (usize, usize) {
    let term_width = term_width();

    let min_call_width = 40;
    let min_input_width = 20;
    let decor_width = 3;
    let extra_width = term_width
        .checked_sub(min_call_width + min_input_width + decor_width)
        .unwrap_or_default();
    let call_width = min_call_width + 2 * extra_width / 3;
    let input_width = min_input_width + extra_width / 3;

    (call_width, input_width)
}

fn term_width() -> usize {
    columns_env().or_else(query_width).unwrap_or(80)
}

fn query_width() -> Option<usize> {
    use is_terminal_polyfill::IsTerminal as _;
    if std::io::stderr().is_terminal() {
        terminal_size::terminal_size().map(|(w, _h)| w.0.into())
    } else {
        None
    }
}

fn columns_env() -> Option<usize> {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
}
