//! Interactive customer shopping session.
//!
//! Signs in as a customer, then runs a small command loop against the
//! stores. The notification slot is drained after every action, so server
//! messages land in the terminal in order.

use std::io::Write as _;

use pagermart_client::{LoginRole, Shop};
use pagermart_core::ItemId;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const HELP: &str = "\
Commands:
  catalog [term]     list items, optionally filtered
  cart               show the cart
  add <item> [qty]   add an item (default quantity 1)
  qty <item> <n>     set a line's quantity (0 removes it)
  rm <item>          remove a line
  buy                check out
  fav <item>         toggle a favorite
  favs               list favorites
  logout             sign out
  help               show this help
  quit               leave";

type InputLines = Lines<BufReader<Stdin>>;

/// Run the interactive session until `quit` or end of input.
pub async fn run(shop: &Shop) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !login(shop, &mut lines).await? {
        return Ok(());
    }
    println!("{} item(s) in your cart.", shop.cart().item_count());
    println!("{HELP}");

    loop {
        print!("pagermart> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !dispatch(shop, line.trim()).await {
            break;
        }
    }
    Ok(())
}

async fn login(shop: &Shop, lines: &mut InputLines) -> std::io::Result<bool> {
    let Some(identifier) = prompt_line(lines, "Username or email: ").await? else {
        return Ok(false);
    };
    let Some(secret) = read_secret(lines).await? else {
        return Ok(false);
    };

    let ok = shop
        .session()
        .login(identifier.trim(), &secret, LoginRole::Customer)
        .await;
    super::drain_notification(shop);
    Ok(ok)
}

async fn read_secret(lines: &mut InputLines) -> std::io::Result<Option<String>> {
    if let Ok(secret) = std::env::var("PAGERMART_PASSWORD") {
        return Ok(Some(secret));
    }
    prompt_line(lines, "Password: ").await
}

async fn prompt_line(lines: &mut InputLines, prompt: &str) -> std::io::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    lines.next_line().await
}

/// Handle one command line. Returns `false` when the session should end.
async fn dispatch(shop: &Shop, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let args: Vec<&str> = parts.collect();

    match command {
        "catalog" => super::catalog::run(shop, args.first().copied()).await,
        "cart" => print_cart(shop),
        "add" => match (parse_item(args.first()), parse_quantity(args.get(1))) {
            (Some(item_id), Some(quantity)) => {
                shop.cart().add_item(item_id, quantity).await;
            }
            _ => println!("Usage: add <item> [qty]"),
        },
        "qty" => match (parse_item(args.first()), args.get(1).and_then(|n| n.parse().ok())) {
            (Some(item_id), Some(quantity)) => {
                shop.cart().set_quantity(item_id, quantity).await;
            }
            _ => println!("Usage: qty <item> <n>"),
        },
        "rm" => match parse_item(args.first()) {
            Some(item_id) => {
                shop.cart().remove_item(item_id).await;
            }
            None => println!("Usage: rm <item>"),
        },
        "buy" => {
            shop.cart().checkout().await;
        }
        "fav" => match parse_item(args.first()) {
            Some(item_id) => {
                if shop.favorites().toggle(item_id).await {
                    let state = if shop.favorites().contains(item_id) {
                        "added"
                    } else {
                        "removed"
                    };
                    println!("Favorite {state}: #{item_id}");
                }
            }
            None => println!("Usage: fav <item>"),
        },
        "favs" => print_favorites(shop).await,
        "logout" => shop.session().logout(),
        "help" => println!("{HELP}"),
        "quit" | "exit" => return false,
        other => println!("Unknown command: {other} (try `help`)"),
    }

    super::drain_notification(shop);
    true
}

fn print_cart(shop: &Shop) {
    let lines = shop.cart().lines();
    if lines.is_empty() {
        println!("Cart is empty.");
        return;
    }
    for line in &lines {
        let id = format!("#{}", line.item_id);
        let subtotal = format!("${}", line.subtotal());
        println!("{id:>5}  {:<28} x{:<3} {subtotal:>10}", line.name, line.quantity);
    }
    println!(
        "{} item(s), total ${}",
        shop.cart().item_count(),
        shop.cart().total()
    );
}

async fn print_favorites(shop: &Shop) {
    if !shop.favorites().refresh().await {
        return;
    }
    let members = shop.favorites().members();
    if members.is_empty() {
        println!("No favorites yet.");
        return;
    }
    shop.catalog().ensure_loaded().await;
    for item_id in members {
        match shop.catalog().get(item_id) {
            Some(item) => println!("  #{item_id}  {}", item.name),
            None => println!("  #{item_id}"),
        }
    }
}

fn parse_item(arg: Option<&&str>) -> Option<ItemId> {
    let raw = arg?.trim_start_matches('#');
    raw.parse::<i32>().ok().map(ItemId::new)
}

fn parse_quantity(arg: Option<&&str>) -> Option<u32> {
    match arg {
        None => Some(1),
        Some(raw) => raw.parse().ok(),
    }
}
