//! Shell state and command loop.
//!
//! Holds the local mirror of the server-side cart session plus the pairing
//! state, and maps shell commands onto API calls. Commands that act on a
//! cart refuse to run until `pair` has opened a session.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use smartcart_core::api::ApiClient;
use smartcart_core::auth::{CredentialStore, SessionStore};
use smartcart_core::config::Config;
use smartcart_core::models::{CartItem, CartSession};

/// Local mirror of the server-side cart session. The server owns the truth;
/// this only re-derives the display aggregates the kiosk shows.
#[derive(Default)]
pub struct CartState {
    session: Option<CartSession>,
}

impl CartState {
    pub fn replace(&mut self, session: CartSession) {
        self.session = Some(session);
    }

    pub fn clear(&mut self) {
        self.session = None;
    }

    pub fn items(&self) -> &[CartItem] {
        self.session
            .as_ref()
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }

    /// Estimated total across all line items.
    pub fn estimated_total(&self) -> i64 {
        self.items().iter().map(CartItem::line_total).sum()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items().iter().map(|i| i.quantity).sum()
    }
}

pub struct App {
    client: ApiClient,
    config: Config,
    session: Arc<SessionStore>,
    session_expired: Arc<AtomicBool>,
    cart: CartState,
}

impl App {
    pub fn new(
        client: ApiClient,
        config: Config,
        session: Arc<SessionStore>,
        session_expired: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client,
            config,
            session,
            session_expired,
            cart: CartState::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("smartcart shell - `help` lists commands");
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            if self.session_expired.swap(false, Ordering::SeqCst) {
                println!("Session expired. Run `login` to continue.");
            }

            print!("smartcart> ");
            io::stdout().flush()?;
            let Some(line) = lines.next() else { break };
            let line = line?;

            let mut parts = line.split_whitespace();
            let Some(command) = parts.next() else {
                continue;
            };
            let args: Vec<&str> = parts.collect();

            match self.dispatch(command, &args).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => eprintln!("error: {:#}", err),
            }
        }

        info!("smartcart shell exiting");
        Ok(())
    }

    /// Returns Ok(true) when the shell should exit.
    async fn dispatch(&mut self, command: &str, args: &[&str]) -> Result<bool> {
        match command {
            "help" => self.help(),
            "quit" | "exit" => return Ok(true),
            "login" => self.login(args).await?,
            "logout" => self.logout().await?,
            "signup" => self.signup(args).await?,
            "whoami" => self.whoami().await?,
            "nickname" => self.nickname(args).await?,
            "pair" => self.pair().await?,
            "unpair" => self.unpair()?,
            "scan" => self.scan(args).await?,
            "cart" | "items" => self.show_cart().await?,
            "add" => self.add(args).await?,
            "qty" => self.qty(args).await?,
            "rm" => self.rm(args).await?,
            "weigh" => self.weigh(args).await?,
            "camera" => self.camera(args).await?,
            "recommend" => self.recommend(args).await?,
            "recipe" => self.recipe(args).await?,
            "checkout" => self.checkout().await?,
            "cancel" => self.cancel().await?,
            _ => println!("Unknown command: {} (try `help`)", command),
        }
        Ok(false)
    }

    fn help(&self) {
        println!("account:  login [email] | logout | signup | whoami | nickname <name>");
        println!("pairing:  pair | unpair | cancel");
        println!("cart:     scan <barcode> [qty] | add <product_id> [qty] | cart");
        println!("          qty <item_id> <n> | rm <item_id> | weigh <grams> | camera <on|off>");
        println!("cooking:  recommend [product_id] | recipe <id>");
        println!("checkout: checkout");
        println!("shell:    help | quit");
    }

    // ===== Pairing guard =====

    fn require_paired(&self) -> Result<i64> {
        self.config
            .cart_session_id
            .ok_or_else(|| anyhow!("Not paired with a cart. Run `pair` first."))
    }

    async fn sync_cart(&mut self, session_id: i64) -> Result<()> {
        let session = self.client.cart(session_id).await?;
        self.cart.replace(session);
        Ok(())
    }

    // ===== Account commands =====

    async fn login(&mut self, args: &[&str]) -> Result<()> {
        let email = match args.first() {
            Some(email) => email.to_string(),
            None => prompt_with_default("email", self.config.last_email.as_deref())?,
        };
        let password = match CredentialStore::get_password(&email) {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password("password: ")?,
        };

        self.client.login(&email, &password).await?;

        if let Err(err) = CredentialStore::store(&email, &password) {
            warn!(error = %err, "Could not store credentials in keychain");
        }
        self.config.last_email = Some(email);
        self.config.save()?;

        let profile = self.client.me().await?;
        println!("Logged in as {}", profile.display_name());
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        self.client.logout().await?;
        // An explicit sign-out also drops the remembered keychain password
        if let Some(email) = self.config.last_email.as_deref() {
            if let Err(err) = CredentialStore::delete(email) {
                warn!(error = %err, "Could not remove keychain credentials");
            }
        }
        // Pairing does not survive the session
        self.config.cart_session_id = None;
        self.config.save()?;
        self.cart.clear();
        println!("Logged out.");
        Ok(())
    }

    async fn signup(&mut self, args: &[&str]) -> Result<()> {
        let email = match args.first() {
            Some(email) => email.to_string(),
            None => prompt_with_default("email", None)?,
        };
        let nickname = prompt_with_default("nickname", None)?;
        let password = rpassword::prompt_password("password: ")?;

        self.client.signup(&email, &password, &nickname).await?;
        println!("Account created. Run `login` to sign in.");
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        if !self.client.gateway().has_token() {
            println!("Not logged in.");
            return Ok(());
        }

        let profile = self.client.me().await?;
        println!("{} <{}>", profile.display_name(), profile.email);

        if let Some(session) = self.session.session() {
            if session.is_stale() {
                println!("Access token is stale; it will refresh on the next call.");
            } else {
                println!(
                    "Access token fresh for ~{} more minutes.",
                    session.minutes_until_stale()
                );
            }
        }

        match self.config.cart_session_id {
            Some(session_id) => println!("Paired with cart session {}", session_id),
            None => println!("Not paired with a cart."),
        }
        Ok(())
    }

    async fn nickname(&mut self, args: &[&str]) -> Result<()> {
        let nickname = args.first().context("usage: nickname <name>")?;
        self.client.update_nickname(nickname).await?;
        println!("Nickname updated.");
        Ok(())
    }

    // ===== Pairing commands =====

    async fn pair(&mut self) -> Result<()> {
        if let Some(session_id) = self.config.cart_session_id {
            println!("Already paired with cart session {}.", session_id);
            return Ok(());
        }

        let session = self.client.create_cart().await.context("Pairing failed")?;
        println!("Paired with cart session {}.", session.cart_session_id);
        self.config.cart_session_id = Some(session.cart_session_id);
        self.config.save()?;
        self.cart.replace(session);
        Ok(())
    }

    /// Forget the pairing locally without touching the server.
    fn unpair(&mut self) -> Result<()> {
        self.config.cart_session_id = None;
        self.config.save()?;
        self.cart.clear();
        println!("Unpaired.");
        Ok(())
    }

    // ===== Cart commands =====

    async fn scan(&mut self, args: &[&str]) -> Result<()> {
        let session_id = self.require_paired()?;
        let barcode = args.first().context("usage: scan <barcode> [qty]")?;
        let quantity = parse_quantity(args.get(1))?;

        let item = self
            .client
            .add_item_by_barcode(session_id, barcode, quantity)
            .await?;
        println!("Added {} x{}.", item.name, item.quantity);

        let product_id = item.product_id;
        self.sync_cart(session_id).await?;
        self.print_totals();

        // Same nudge the kiosk shows after a scan
        match self
            .client
            .recommendations_by_product(product_id, Some(session_id))
            .await
        {
            Ok(recipes) if !recipes.is_empty() => {
                println!("Recipes you could make:");
                for recipe in recipes.iter().take(3) {
                    println!("  [{}] {}", recipe.recipe_id, recipe.title);
                }
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Recommendation fetch failed"),
        }
        Ok(())
    }

    async fn add(&mut self, args: &[&str]) -> Result<()> {
        let session_id = self.require_paired()?;
        let product_id: i64 = args
            .first()
            .context("usage: add <product_id> [qty]")?
            .parse()
            .context("product_id must be a number")?;
        let quantity = parse_quantity(args.get(1))?;

        let item = self.client.add_item(session_id, product_id, quantity).await?;
        println!("Added {} x{}.", item.name, item.quantity);
        self.sync_cart(session_id).await?;
        self.print_totals();
        Ok(())
    }

    async fn show_cart(&mut self) -> Result<()> {
        let session_id = self.require_paired()?;
        self.sync_cart(session_id).await?;

        if self.cart.items().is_empty() {
            println!("Cart is empty.");
            return Ok(());
        }
        for item in self.cart.items() {
            println!(
                "{:>5}  {:<32} x{:<3} {:>8}  [{:?}]",
                item.cart_item_id,
                item.name,
                item.quantity,
                item.line_total(),
                item.status
            );
        }
        self.print_totals();
        Ok(())
    }

    async fn qty(&mut self, args: &[&str]) -> Result<()> {
        let session_id = self.require_paired()?;
        let item_id: i64 = args
            .first()
            .context("usage: qty <item_id> <n>")?
            .parse()
            .context("item_id must be a number")?;
        let quantity: u32 = args
            .get(1)
            .context("usage: qty <item_id> <n>")?
            .parse()
            .context("quantity must be a number")?;
        if quantity < 1 {
            return Err(anyhow!("quantity must be at least 1"));
        }

        self.client.update_quantity(item_id, quantity).await?;
        self.sync_cart(session_id).await?;
        self.print_totals();
        Ok(())
    }

    async fn rm(&mut self, args: &[&str]) -> Result<()> {
        let session_id = self.require_paired()?;
        let item_id: i64 = args
            .first()
            .context("usage: rm <item_id>")?
            .parse()
            .context("item_id must be a number")?;

        self.client.remove_item(item_id).await?;
        self.sync_cart(session_id).await?;
        self.print_totals();
        Ok(())
    }

    async fn weigh(&mut self, args: &[&str]) -> Result<()> {
        let session_id = self.require_paired()?;
        let grams: f64 = args
            .first()
            .context("usage: weigh <grams>")?
            .parse()
            .context("grams must be a number")?;

        let result = self.client.validate_weight(session_id, grams).await?;
        if result.is_valid {
            println!("Weight OK ({} g measured).", result.measured_weight_g);
        } else {
            println!(
                "Weight mismatch: measured {} g, expected {} g (diff {} g).",
                result.measured_weight_g, result.expected_weight_g, result.diff_weight_g
            );
        }
        Ok(())
    }

    async fn camera(&mut self, args: &[&str]) -> Result<()> {
        let session_id = self.require_paired()?;
        let on = match args.first() {
            Some(&"on") => true,
            Some(&"off") => false,
            _ => return Err(anyhow!("usage: camera <on|off>")),
        };
        self.client.set_camera_view(session_id, on).await?;
        println!("Camera view {}.", if on { "on" } else { "off" });
        Ok(())
    }

    // ===== Recommendation commands =====

    async fn recommend(&mut self, args: &[&str]) -> Result<()> {
        let recipes = match args.first() {
            Some(raw) => {
                let product_id: i64 = raw.parse().context("product_id must be a number")?;
                self.client
                    .recommendations_by_product(product_id, self.config.cart_session_id)
                    .await?
            }
            None => {
                let session_id = self.require_paired()?;
                self.client.recommendations_by_cart(session_id).await?
            }
        };

        if recipes.is_empty() {
            println!("No recommendations.");
            return Ok(());
        }
        for recipe in &recipes {
            match recipe.score {
                Some(score) => println!("  [{}] {} ({:.2})", recipe.recipe_id, recipe.title, score),
                None => println!("  [{}] {}", recipe.recipe_id, recipe.title),
            }
        }
        Ok(())
    }

    async fn recipe(&mut self, args: &[&str]) -> Result<()> {
        let recipe_id: i64 = args
            .first()
            .context("usage: recipe <id>")?
            .parse()
            .context("recipe id must be a number")?;

        let recipe = self.client.recipe(recipe_id).await?;
        println!("{}", recipe.title);
        if let Some(description) = &recipe.description {
            println!("{}", description);
        }
        if let Some(minutes) = recipe.cooking_time_min {
            println!("~{} min, {}", minutes, recipe.difficulty.as_deref().unwrap_or("any level"));
        }
        if !recipe.ingredients.is_empty() {
            println!("Ingredients:");
            for ingredient in &recipe.ingredients {
                match &ingredient.quantity_info {
                    Some(info) => println!("  - {} ({})", ingredient.name, info),
                    None => println!("  - {}", ingredient.name),
                }
            }
        }
        if let Some(instructions) = &recipe.instructions {
            println!("{}", instructions);
        }
        Ok(())
    }

    // ===== Checkout =====

    async fn checkout(&mut self) -> Result<()> {
        let session_id = self.require_paired()?;
        self.sync_cart(session_id).await?;
        if self.cart.items().is_empty() {
            return Err(anyhow!("Cart is empty, nothing to check out."));
        }

        self.client.checkout(session_id).await?;
        println!(
            "Checkout started for {} items, total {}.",
            self.cart.total_quantity(),
            self.cart.estimated_total()
        );
        self.config.cart_session_id = None;
        self.config.save()?;
        self.cart.clear();
        Ok(())
    }

    async fn cancel(&mut self) -> Result<()> {
        let session_id = self.require_paired()?;
        self.client.cancel_cart(session_id).await?;
        self.config.cart_session_id = None;
        self.config.save()?;
        self.cart.clear();
        println!("Cart session cancelled.");
        Ok(())
    }

    fn print_totals(&self) {
        println!(
            "{} items, estimated total {}",
            self.cart.total_quantity(),
            self.cart.estimated_total()
        );
    }
}

fn parse_quantity(raw: Option<&&str>) -> Result<u32> {
    match raw {
        Some(raw) => {
            let quantity: u32 = raw.parse().context("quantity must be a number")?;
            if quantity < 1 {
                return Err(anyhow!("quantity must be at least 1"));
            }
            Ok(quantity)
        }
        None => Ok(1),
    }
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        default
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{} is required", label))
    } else {
        Ok(input.to_string())
    }
}
