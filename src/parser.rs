use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::data::{MapCell, Pos};
use crate::level::Level;
use crate::map::GoalMap;
use crate::state::State;
use crate::vec2d::Vec2d;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserErr {
    Pos(usize, usize),
    MultiplePlayers,
    NoPlayer,
}

impl Display for ParserErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            ParserErr::Pos(r, c) => write!(f, "Invalid cell at pos: [{}, {}]", r, c),
            ParserErr::MultiplePlayers => write!(f, "Too many players"),
            ParserErr::NoPlayer => write!(f, "No player"),
        }
    }
}

impl Error for ParserErr {}

/// Parses (a subset of) the format described [here](http://www.sokobano.de/wiki/index.php?title=Level_format)
pub fn parse_level(level: &str) -> Result<Level, ParserErr> {
    // trim so we can specify levels using raw strings more easily
    let level = level.trim_matches('\n');

    let mut grid = Vec::new();
    let mut goals = Vec::new();
    let mut boxes = Vec::new();
    let mut player_pos = None;

    for (r, line) in level.lines().enumerate() {
        let mut line_cells = Vec::new();
        for (c, cur_char) in line.chars().enumerate() {
            let cell = match cur_char {
                '#' => MapCell::Wall,
                'p' | '@' => {
                    if player_pos.is_some() {
                        return Err(ParserErr::MultiplePlayers);
                    }
                    player_pos = Some(Pos::new(r as u8, c as u8));
                    MapCell::Empty
                }
                'P' | '+' => {
                    if player_pos.is_some() {
                        return Err(ParserErr::MultiplePlayers);
                    }
                    player_pos = Some(Pos::new(r as u8, c as u8));
                    goals.push(Pos::new(r as u8, c as u8));
                    MapCell::Goal
                }
                'b' | '$' => {
                    boxes.push(Pos::new(r as u8, c as u8));
                    MapCell::Empty
                }
                'B' | '*' => {
                    boxes.push(Pos::new(r as u8, c as u8));
                    goals.push(Pos::new(r as u8, c as u8));
                    MapCell::Goal
                }
                '.' => {
                    goals.push(Pos::new(r as u8, c as u8));
                    MapCell::Goal
                }
                ' ' | '-' | '_' => MapCell::Empty,
                _ => return Err(ParserErr::Pos(r, c)),
            };
            line_cells.push(cell);
        }
        grid.push(line_cells);
    }

    let player_pos = player_pos.ok_or(ParserErr::NoPlayer)?;
    // if the player exists, the map is at least 1x1
    // short rows are padded with floor by Vec2d
    let grid = Vec2d::new(&grid);

    Ok(Level::new(
        GoalMap::new(grid, goals),
        State::new(player_pos, boxes),
    ))
}

/// One level of a collection file, map text kept unparsed so a single broken
/// map doesn't take the rest of the collection down with it.
#[derive(Debug, Clone)]
pub struct CollectionEntry {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub author: String,
    text: String,
}

impl CollectionEntry {
    pub fn level(&self) -> Result<Level, ParserErr> {
        parse_level(&self.text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Splits a collection file into its levels.
///
/// `Title:` lines separate levels; `Description:` and `Author:` lines apply
/// to the following map until the next `Title:`. Numeric titles carry the
/// level number, any other title continues the numbering. Content before the
/// first `Title:` is ignored.
pub fn parse_collection(content: &str) -> Vec<CollectionEntry> {
    let mut entries = Vec::new();
    let mut current: Option<CollectionEntry> = None;
    let mut last_number = 0;

    for line in content.lines() {
        let line = line.trim_end();
        if let Some(title) = strip_header(line, "Title:") {
            if let Some(entry) = current.take() {
                if !entry.text.is_empty() {
                    entries.push(entry);
                }
            }
            let number = match title.parse() {
                Ok(n) => n,
                Err(_) => last_number + 1,
            };
            last_number = number;
            current = Some(CollectionEntry {
                number,
                title: title.to_string(),
                description: String::new(),
                author: String::new(),
                text: String::new(),
            });
        } else if let Some(description) = strip_header(line, "Description:") {
            if let Some(ref mut entry) = current {
                entry.description = description.to_string();
            }
        } else if let Some(author) = strip_header(line, "Author:") {
            if let Some(ref mut entry) = current {
                entry.author = author.to_string();
            }
        } else if is_map_line(line) {
            if let Some(ref mut entry) = current {
                entry.text.push_str(line);
                entry.text.push('\n');
            }
        }
    }
    if let Some(entry) = current {
        if !entry.text.is_empty() {
            entries.push(entry);
        }
    }

    entries
}

fn strip_header<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    if line.starts_with(header) {
        Some(line[header.len()..].trim())
    } else {
        None
    }
}

fn is_map_line(line: &str) -> bool {
    !line.is_empty()
        && line.chars().all(|c| "#@$.*+pPbB -_".contains(c))
        && line.chars().any(|c| "#@$.*+".contains(c))
}
