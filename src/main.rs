use loadpace::error::AppResult;

fn main() -> AppResult<()> {
    loadpace::run()
}
