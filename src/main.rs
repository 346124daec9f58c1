use vidstress::error::AppResult;

fn main() -> AppResult<()> {
    vidstress::entry::run()
}
