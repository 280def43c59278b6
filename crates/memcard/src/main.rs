use std::path::PathBuf;

use argh::FromArgs;
use colored::Colorize;

use memcard::{CardHandle, Error};
use ps2_filetypes::parse_icon_sys;

#[derive(Debug, FromArgs)]
#[argh(description = "Reads a PS2 memory card image and lists or exports the games on it.\n\tmemcard card.ps2\t\t\t# list the games on the card\n\tmemcard card.ps2 -g MyGame\t\t# show MyGame's files and icon.sys subtitle\n\tmemcard card.ps2 -g MyGame -o out/\t# export MyGame's files to out/MyGame/")]
struct Args {
    /// path to the .ps2 memory card image
    #[argh(positional)]
    path: String,
    /// name of the game to inspect or export
    #[argh(option, short = 'g')]
    game: Option<String>,
    /// destination directory to export the game's files into
    #[argh(option, short = 'o')]
    dest: Option<String>,
}

fn main() -> Result<(), Error> {
    let args: Args = argh::from_env();
    let card = CardHandle::open(&args.path)?;

    match (&args.game, &args.dest) {
        (None, _) => list_root(&card),
        (Some(name), None) => list_game(&card, name)?,
        (Some(name), Some(dest)) => export_game(&card, name, dest)?,
    }

    Ok(())
}

fn list_root(card: &CardHandle) {
    for entry in card.list_root() {
        println!("{}", entry.name.green());
    }
}

fn list_game(card: &CardHandle, name: &str) -> Result<(), Error> {
    let children = card.lookup(name)?;

    for entry in &children {
        println!("{}", entry.name);
    }

    let icon_sys_entry = children
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case("icon.sys"));

    if let Some(icon_sys_entry) = icon_sys_entry {
        let data = card.read_file(icon_sys_entry)?;
        match parse_icon_sys(&data) {
            Ok(icon_sys) => {
                println!("{}: {}", "subtitle".cyan(), icon_sys.subtitle.0);
                println!("{}: {}", "icon".cyan(), icon_sys.icon_file_normal);
            }
            Err(err) => eprintln!("{}: {err}", "warning".yellow()),
        }
    }

    Ok(())
}

fn export_game(card: &CardHandle, name: &str, dest: &str) -> Result<(), Error> {
    let out_dir = card.export(name, &PathBuf::from(dest))?;
    println!("Wrote {}!", out_dir.display().to_string().green());
    Ok(())
}
