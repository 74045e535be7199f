// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.



use clap::Parser;
use std::path::PathBuf;
use anyhow::anyhow;
use tracing::info;
use condorcet::ballot_paper::VoteFilter;
use condorcet::data_handler::MemoryDataHandler;
use condorcet::methods::Method;
use main_app::ElectionFile;

#[derive(Parser)]
#[command(version = "0.1", author = "Andrew Conway", name="condorcet_tally")]
/// Rank the candidates in an election using Condorcet methods.
struct Opts {
    /// The name of the .json file describing the candidates and votes.
    election : PathBuf,

    /// The methods to use, e.g. "Schulze Margin" or "Ranked Pairs Winning". May be given multiple times.
    /// Defaults to Schulze Winning.
    #[arg(short, long)]
    method : Vec<Method>,

    /// Only count votes with at least one of these tags. May be given multiple times.
    #[arg(long)]
    tag : Vec<String>,

    /// Instead of only counting votes with one of the tags, count votes with none of them.
    #[arg(long,requires="tag")]
    without_tag : bool,

    /// Print the pairwise matrix, as JSON.
    #[arg(long)]
    pairwise : bool,

    /// If set, candidates left off a vote are not considered to be ranked below those on it. Overrides the file.
    #[arg(long)]
    explicit_ranking : bool,

    /// If set, vote weights are used. Overrides the file.
    #[arg(long)]
    allow_vote_weight : bool,

    /// The most candidates ranked pairs will be used for. Overrides the file.
    #[arg(long)]
    ranked_pairs_max_candidates : Option<usize>,

    /// Keep full containers of votes in a separate store rather than in the election's own memory.
    /// This is mainly useful for checking that it makes no difference.
    #[arg(long)]
    spill : bool,

    /// Log progress to stderr.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let opt : Opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| (if opt.verbose { "debug" } else { "warn" }).into()),
        )
        .init();

    let file = ElectionFile::load(&opt.election)?;
    let mut election = file.into_election(|config|{
        if opt.explicit_ranking { config.implicit_ranking=false; }
        if opt.allow_vote_weight { config.vote_weight_allowed=true; }
        if opt.ranked_pairs_max_candidates.is_some() { config.ranked_pairs_max_candidates=opt.ranked_pairs_max_candidates; }
    })?;
    if opt.spill { election.set_external_handler(Box::new(MemoryDataHandler::new()))?; }
    info!(votes=election.count_votes(None)?,candidates=election.num_candidates(),"Loaded election");

    let filter = if opt.tag.is_empty() { None } else if opt.without_tag { Some(VoteFilter::without_tags(opt.tag.iter().cloned())?) } else { Some(VoteFilter::with_tags(opt.tag.iter().cloned())?) };
    let methods = if opt.method.is_empty() { vec![Method::default()] } else { opt.method.clone() };

    println!("Votes counted : {}",election.count_votes(filter.as_ref())?);
    if opt.pairwise {
        println!("{}",serde_json::to_string_pretty(&election.explicit_pairwise(filter.as_ref())?)?);
    }
    let condorcet_winner = election.pairwise_filtered(filter.as_ref())?.condorcet_winner();
    match condorcet_winner {
        Some(winner) => println!("Condorcet winner : {}",election.candidates().name(winner)),
        None => println!("No Condorcet winner"),
    }
    for method in methods {
        let result = election.result_filtered(method,filter.as_ref()).map_err(|e|anyhow!("{} failed : {}",method,e))?.clone();
        println!("{} : {}",method,result.to_string_with(election.candidates()));
    }
    Ok(())
}
