// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::cmd::add::add_words;
use crate::cmd::review::review;
use crate::cmd::stats::print_stats;
use crate::config::Config;
use crate::due::DEFAULT_LIMIT;
use crate::error::Fallible;
use crate::web::server::start_server;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. Defaults to ./nekowords.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up words and add them to the collection.
    Add {
        /// Words to add. Prompts for words when none are given.
        words: Vec<String>,
        /// Language tag. Defaults to the configured language.
        #[arg(short = 't', long)]
        tag: Option<String>,
    },
    /// Review the due cards in the terminal.
    Review {
        /// Language tag. Defaults to the configured language.
        #[arg(short = 't', long)]
        tag: Option<String>,
        /// Maximum number of cards to review.
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Start the HTTP API and the browser drill.
    Serve {
        /// Open the drill in a browser once the server is up.
        #[arg(long)]
        open: bool,
        /// Language tag. Defaults to the configured language.
        #[arg(short = 't', long)]
        tag: Option<String>,
        /// Maximum number of cards in the drill session.
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Print collection statistics as JSON.
    Stats {
        /// Language tag. Defaults to the configured language.
        #[arg(short = 't', long)]
        tag: Option<String>,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let config = Config::load(cli.config)?;
    match cli.command {
        Command::Add { words, tag } => {
            let language = tag.unwrap_or_else(|| config.language.clone());
            add_words(&config, words, &language).await
        }
        Command::Review { tag, limit } => {
            let language = tag.unwrap_or_else(|| config.language.clone());
            review(&config, &language, limit)
        }
        Command::Serve { open, tag, limit } => {
            let language = tag.unwrap_or_else(|| config.language.clone());
            start_server(&config, language, limit, open).await
        }
        Command::Stats { tag } => {
            let language = tag.unwrap_or_else(|| config.language.clone());
            print_stats(&config, &language)
        }
    }
}
