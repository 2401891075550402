use clap::Parser;
use gridduel_protocol::{
    recv_message, send_message, BoardSnapshot, Cell, ClientMessage,
    InvalidReason, Outcome, PlayerId, ServerMessage,
};
use gridduel_transport::{connect, TcpConnection};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Play Gridduel from a terminal.
#[derive(Parser, Debug)]
#[command(name = "terminal-client")]
struct Cli {
    /// Server address.
    #[arg(long, default_value = "127.0.0.1:4444")]
    addr: String,
}

// ---------------------------------------------------------------------------
// Input and rendering
// ---------------------------------------------------------------------------

/// Parses "row col". Coordinates outside the board are passed through;
/// the server decides whether a move is valid.
fn parse_move(line: &str) -> Result<(u8, u8), String> {
    let mut parts = line.split_whitespace();
    let (Some(row), Some(col), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("enter a row and a column, e.g. `1 2`".into());
    };
    let row = row.parse().map_err(|_| format!("{row:?} is not a number 0-255"))?;
    let col = col.parse().map_err(|_| format!("{col:?} is not a number 0-255"))?;
    Ok((row, col))
}

fn parse_id(line: &str) -> Result<PlayerId, String> {
    line.trim()
        .parse()
        .map(PlayerId)
        .map_err(|_| format!("{:?} is not a player ID (0-255)", line.trim()))
}

fn render_board(board: &BoardSnapshot) -> String {
    board
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Cell::Empty => "_",
                    Cell::X => "X",
                    Cell::O => "O",
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_outcome(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Draw => "The game ended in a tie.",
        Outcome::Won => "You won!",
        Outcome::Lost => "You lose!",
    }
}

fn describe_invalid(reason: InvalidReason) -> &'static str {
    match reason {
        InvalidReason::OutOfRange => "Location out of range.",
        InvalidReason::LocationTaken => "Location taken.",
    }
}

// ---------------------------------------------------------------------------
// Game loop
// ---------------------------------------------------------------------------

/// Prompts until `parse` accepts a line. `None` means stdin closed.
async fn ask<T>(
    input: &mut Lines<BufReader<Stdin>>,
    prompt: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> std::io::Result<Option<T>> {
    loop {
        println!("{prompt}");
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match parse(&line) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => println!("{e}"),
        }
    }
}

async fn play(conn: &TcpConnection) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    while let Some(msg) = recv_message::<ServerMessage, _>(conn).await? {
        match msg {
            ServerMessage::Wait => println!("Waiting for the other player..."),
            ServerMessage::RequestId => {
                let Some(id) = ask(&mut input, "Enter your player ID:", parse_id).await? else {
                    return Ok(());
                };
                send_message(conn, &ClientMessage::IdReply(id)).await?;
            }
            ServerMessage::Record(record) => println!("Welcome, {record}"),
            ServerMessage::YourTurn(board) => {
                println!("\n{}\n", render_board(&board));
                let Some((row, col)) =
                    ask(&mut input, "Enter the location for your next move:", parse_move).await?
                else {
                    return Ok(());
                };
                send_message(conn, &ClientMessage::Move { row, col }).await?;
            }
            ServerMessage::Invalid(reason) => println!("{}", describe_invalid(reason)),
            ServerMessage::GameOver { outcome, board } => {
                println!("\n{}\n\n{}", describe_outcome(outcome), render_board(&board));
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let conn = connect(&cli.addr).await?;
    println!("connected to {}", cli.addr);
    play(&conn).await
}
