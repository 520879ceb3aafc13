// Copyright (c) 2017-2021 Fabian Schuiki

fn main() {
    lalrpop::process_root().unwrap();
}
